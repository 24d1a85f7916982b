//! HTTP-only renderer wrapping reqwest.
//!
//! Not a browser. Scripts never run, so every snapshot it returns is the
//! initial payload a no-script client sees. That makes it a truthful backend
//! for the forced no-script navigation and for no-script profiles.

use super::{check_status, PageRenderer, PageSource, RenderConstraints};
use crate::error::RenderError;
use crate::types::TimingMetrics;
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Plain HTTP fetcher.
#[derive(Clone)]
pub struct HttpRenderer {
    client: reqwest::Client,
}

impl HttpRenderer {
    /// Create a renderer whose requests give up after `timeout_ms`.
    ///
    /// No cookie store is configured, so cookies are never persisted
    /// between requests whatever the profile says.
    pub fn new(timeout_ms: u64) -> Result<Self, RenderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| RenderError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    fn name(&self) -> &str {
        "http"
    }

    async fn navigate(
        &self,
        url: &str,
        constraints: &RenderConstraints,
    ) -> Result<PageSource, RenderError> {
        let parsed = parse_http_url(url)?;
        let start = Instant::now();

        let resp = self
            .client
            .get(parsed)
            .header(reqwest::header::USER_AGENT, constraints.user_agent.as_str())
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RenderError::Timeout {
                        ms: start.elapsed().as_millis() as u64,
                    }
                } else {
                    RenderError::Navigation(e.to_string())
                }
            })?;

        let status = check_status(resp.status().as_u16())?;
        let final_url = resp.url().to_string();
        let first_byte_ms = start.elapsed().as_millis() as u64;

        let html = resp
            .text()
            .await
            .map_err(|e| RenderError::Navigation(format!("failed to read body: {e}")))?;
        let total_ms = start.elapsed().as_millis() as u64;

        tracing::debug!("http fetch {url}: status={status}, {total_ms}ms, {} bytes", html.len());

        Ok(PageSource {
            requested_url: url.to_string(),
            final_url,
            status,
            html,
            script_enabled: false,
            timing: TimingMetrics {
                dom_content_loaded: first_byte_ms,
                load_complete: total_ms,
                total_load_time: total_ms,
                dom_element_count: 0,
            },
        })
    }
}

/// Accept only absolute `http`/`https` URLs.
pub fn parse_http_url(url: &str) -> Result<url::Url, RenderError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| RenderError::Navigation(format!("invalid URL '{url}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(RenderError::Navigation(format!(
            "unsupported scheme '{other}' in {url}"
        ))),
    }
}
