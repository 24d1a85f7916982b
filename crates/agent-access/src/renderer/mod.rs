//! Renderer abstraction for loading a page under a capability profile.
//!
//! Defines the `PageRenderer` trait the pipeline depends on, the
//! `RenderConstraints` a profile projects onto it, and the raw `PageSource`
//! an adapter hands back. Concrete adapters: HTTP-only (`http`), headless
//! Chromium (`chromium`, behind the `chromium` feature) and an in-memory
//! `StaticRenderer` for saved pages and fixtures.

#[cfg(feature = "chromium")]
pub mod chromium;
pub mod http;

use crate::error::RenderError;
use crate::profile::CapabilityProfile;
use crate::types::TimingMetrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// What a renderer must honor for one navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConstraints {
    pub script_enabled: bool,
    pub css_enabled: bool,
    pub images_enabled: bool,
    pub cookies_enabled: bool,
    pub user_agent: String,
    /// How long to let late content settle after the initial load.
    pub settle_wait: Duration,
}

impl RenderConstraints {
    /// Project a profile, capping its settle wait at `ceiling`.
    pub fn from_profile(profile: &CapabilityProfile, ceiling: Duration) -> Self {
        let wanted = profile
            .max_script_wait_ms
            .map(Duration::from_millis)
            .unwrap_or(Duration::ZERO);
        Self {
            script_enabled: profile.script_enabled,
            css_enabled: profile.css_enabled,
            images_enabled: profile.images_enabled,
            cookies_enabled: profile.cookies_enabled,
            user_agent: profile.synthetic_user_agent.clone(),
            settle_wait: if profile.script_enabled {
                wanted.min(ceiling)
            } else {
                Duration::ZERO
            },
        }
    }

    /// The same constraints with script forced off, regardless of profile.
    pub fn without_script(&self) -> Self {
        Self {
            script_enabled: false,
            settle_wait: Duration::ZERO,
            ..self.clone()
        }
    }
}

/// Raw payload of a navigation, before parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSource {
    pub requested_url: String,
    pub final_url: String,
    pub status: u16,
    pub html: String,
    /// Whether scripts ran while producing `html`.
    pub script_enabled: bool,
    pub timing: TimingMetrics,
}

/// Map an HTTP status onto the adapter contract: error pages never reach
/// the rule checks.
pub fn check_status(status: u16) -> Result<u16, RenderError> {
    if status >= 400 {
        Err(RenderError::Status { code: status })
    } else {
        Ok(status)
    }
}

/// A backend that can load a URL under given constraints.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    /// Load `url` and return its settled snapshot.
    async fn navigate(
        &self,
        url: &str,
        constraints: &RenderConstraints,
    ) -> Result<PageSource, RenderError>;
}

/// A page served by `StaticRenderer`.
#[derive(Debug, Clone, Default)]
pub struct StaticPage {
    /// Markup after scripts ran.
    pub html: String,
    /// Markup served to a client without script; falls back to `html`.
    pub noscript_html: Option<String>,
    pub timing: TimingMetrics,
}

/// Serves pre-registered markup from memory.
///
/// Scripts are never executed; the script-enabled and script-disabled
/// variants of a page are registered up front.
#[derive(Default)]
pub struct StaticRenderer {
    pages: HashMap<String, StaticPage>,
    delay: Option<Duration>,
    log: Mutex<Vec<(String, bool)>>,
}

impl StaticRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one markup variant served regardless of script support.
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(
            url.into(),
            StaticPage {
                html: html.into(),
                ..StaticPage::default()
            },
        );
        self
    }

    /// Register distinct markup for script-enabled and script-disabled clients.
    pub fn with_variants(
        mut self,
        url: impl Into<String>,
        rendered_html: impl Into<String>,
        noscript_html: impl Into<String>,
    ) -> Self {
        self.pages.insert(
            url.into(),
            StaticPage {
                html: rendered_html.into(),
                noscript_html: Some(noscript_html.into()),
                ..StaticPage::default()
            },
        );
        self
    }

    pub fn with_static_page(mut self, url: impl Into<String>, page: StaticPage) -> Self {
        self.pages.insert(url.into(), page);
        self
    }

    /// Register the contents of a saved HTML file under `url`.
    pub fn with_file(self, url: impl Into<String>, path: &Path) -> std::io::Result<Self> {
        let html = std::fs::read_to_string(path)?;
        Ok(self.with_page(url, html))
    }

    /// Delay every navigation, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every navigation so far as `(url, script_enabled)`.
    pub fn navigations(&self) -> Vec<(String, bool)> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PageRenderer for StaticRenderer {
    fn name(&self) -> &str {
        "static"
    }

    async fn navigate(
        &self,
        url: &str,
        constraints: &RenderConstraints,
    ) -> Result<PageSource, RenderError> {
        if let Ok(mut log) = self.log.lock() {
            log.push((url.to_string(), constraints.script_enabled));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let page = self
            .pages
            .get(url)
            .ok_or_else(|| RenderError::Navigation(format!("no page registered for {url}")))?;

        let html = if constraints.script_enabled {
            page.html.clone()
        } else {
            page.noscript_html.clone().unwrap_or_else(|| page.html.clone())
        };

        Ok(PageSource {
            requested_url: url.to_string(),
            final_url: url.to_string(),
            status: 200,
            html,
            script_enabled: constraints.script_enabled,
            timing: page.timing,
        })
    }
}
