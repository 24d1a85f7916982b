//! Chromium-based renderer using chromiumoxide.

use super::{check_status, PageRenderer, PageSource, RenderConstraints};
use crate::error::RenderError;
use crate::types::TimingMetrics;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDocumentCookieDisabledParams, SetScriptExecutionDisabledParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, SetBlockedUrLsParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

const STYLESHEET_PATTERNS: &[&str] = &["*.css", "*.css?*"];
const IMAGE_PATTERNS: &[&str] = &[
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.webp", "*.svg", "*.ico", "*.avif",
];

const TIMING_SCRIPT: &str = r#"(() => {
    const t = performance.timing;
    const s = t.navigationStart;
    return {
        domContentLoaded: Math.max(0, t.domContentLoadedEventEnd - s),
        loadComplete: Math.max(0, t.loadEventEnd - s),
        domElementCount: document.getElementsByTagName('*').length
    };
})()"#;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("AGENT_ACCESS_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let candidates = [
            home.join(".agent-access/chromium/chrome-linux64/chrome"),
            home.join(".agent-access/chromium/chrome"),
        ];
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageTiming {
    dom_content_loaded: u64,
    load_complete: u64,
    dom_element_count: u64,
}

/// A tab inside its own browser context. Dropping it closes the tab and
/// disposes the context, so cookies and storage never outlive one
/// navigation, even when the navigation future is dropped at a deadline.
struct IsolatedTab {
    browser: Arc<Browser>,
    context: BrowserContextId,
    page: Page,
}

impl IsolatedTab {
    async fn open(browser: &Arc<Browser>) -> Result<Self, RenderError> {
        let context = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| RenderError::Unavailable(format!("failed to create context: {e}")))?
            .result
            .browser_context_id;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.clone())
            .build()
            .map_err(RenderError::Unavailable)?;

        match browser.new_page(target).await {
            Ok(page) => Ok(Self {
                browser: Arc::clone(browser),
                context,
                page,
            }),
            Err(e) => {
                let _ = browser
                    .execute(DisposeBrowserContextParams::new(context))
                    .await;
                Err(RenderError::Unavailable(format!("failed to create page: {e}")))
            }
        }
    }
}

impl Drop for IsolatedTab {
    fn drop(&mut self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let browser = Arc::clone(&self.browser);
        let context = self.context.clone();
        let page = self.page.clone();
        runtime.spawn(async move {
            let _ = page.close().await;
            if let Err(e) = browser
                .execute(DisposeBrowserContextParams::new(context))
                .await
            {
                tracing::debug!("failed to dispose browser context: {e}");
            }
        });
    }
}

/// Headless Chromium renderer. Each navigation gets a fresh tab in a fresh
/// browser context.
pub struct ChromiumRenderer {
    browser: Arc<Browser>,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance.
    pub async fn new() -> Result<Self, RenderError> {
        let chrome_path = find_chromium().ok_or_else(|| {
            RenderError::Unavailable(
                "Chromium not found; set AGENT_ACCESS_CHROMIUM_PATH".to_string(),
            )
        })?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| RenderError::Unavailable(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Unavailable(format!("failed to launch Chromium: {e}")))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
        })
    }

    async fn apply_constraints(
        page: &Page,
        constraints: &RenderConstraints,
    ) -> Result<(), RenderError> {
        let cdp = |e: chromiumoxide::error::CdpError| RenderError::Navigation(e.to_string());

        page.execute(SetUserAgentOverrideParams::new(constraints.user_agent.clone()))
            .await
            .map_err(cdp)?;
        page.execute(SetScriptExecutionDisabledParams::new(!constraints.script_enabled))
            .await
            .map_err(cdp)?;

        let mut blocked: Vec<String> = Vec::new();
        if !constraints.css_enabled {
            blocked.extend(STYLESHEET_PATTERNS.iter().map(|p| p.to_string()));
        }
        if !constraints.images_enabled {
            blocked.extend(IMAGE_PATTERNS.iter().map(|p| p.to_string()));
        }
        if !blocked.is_empty() {
            page.execute(EnableParams::default()).await.map_err(cdp)?;
            page.execute(SetBlockedUrLsParams::new(blocked))
                .await
                .map_err(cdp)?;
        }

        // The context starts with an empty jar; this also stops script writes.
        if !constraints.cookies_enabled {
            page.execute(SetDocumentCookieDisabledParams::new(true))
                .await
                .map_err(cdp)?;
        }
        Ok(())
    }

    async fn snapshot(
        page: &Page,
        url: &str,
        constraints: &RenderConstraints,
        start: Instant,
    ) -> Result<PageSource, RenderError> {
        Self::apply_constraints(page, constraints).await?;

        page.goto(url)
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;
        // data: and about: URLs carry no network response.
        let status = page
            .wait_for_navigation_response()
            .await
            .ok()
            .flatten()
            .and_then(|request| request.response.as_ref().map(|r| r.status))
            .and_then(|code| u16::try_from(code).ok())
            .unwrap_or(200);
        let status = check_status(status)?;

        if !constraints.settle_wait.is_zero() {
            tokio::time::sleep(constraints.settle_wait).await;
        }

        let html: String = page
            .evaluate("document.documentElement.outerHTML")
            .await
            .map_err(|e| RenderError::Navigation(format!("failed to read HTML: {e}")))?
            .into_value()
            .map_err(|e| RenderError::Navigation(format!("failed to convert HTML: {e:?}")))?;

        // Wall-clock timing when the probe cannot run.
        let total_ms = start.elapsed().as_millis() as u64;
        let timing = match page.evaluate(TIMING_SCRIPT).await {
            Ok(v) => v
                .into_value::<PageTiming>()
                .map(|t| TimingMetrics {
                    dom_content_loaded: t.dom_content_loaded,
                    load_complete: t.load_complete,
                    total_load_time: total_ms,
                    dom_element_count: t.dom_element_count,
                })
                .unwrap_or(TimingMetrics {
                    total_load_time: total_ms,
                    ..TimingMetrics::default()
                }),
            Err(_) => TimingMetrics {
                dom_content_loaded: total_ms,
                load_complete: total_ms,
                total_load_time: total_ms,
                dom_element_count: 0,
            },
        };

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .map(|u| u.to_string())
            .unwrap_or_else(|| url.to_string());

        Ok(PageSource {
            requested_url: url.to_string(),
            final_url,
            status,
            html,
            script_enabled: constraints.script_enabled,
            timing,
        })
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    fn name(&self) -> &str {
        "chromium"
    }

    async fn navigate(
        &self,
        url: &str,
        constraints: &RenderConstraints,
    ) -> Result<PageSource, RenderError> {
        let start = Instant::now();
        let tab = IsolatedTab::open(&self.browser).await?;
        Self::snapshot(&tab.page, url, constraints, start).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileRegistry;
    use chromiumoxide::cdp::browser_protocol::target::GetBrowserContextsParams;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal HTTP server: `respond` maps the raw request to a status line,
    /// extra headers and a body.
    async fn serve(
        delay: Duration,
        respond: fn(&str) -> (&'static str, &'static str, &'static str),
    ) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).to_string();
                    tokio::time::sleep(delay).await;
                    let (status, headers, body) = respond(&request);
                    let response = format!(
                        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\n{headers}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });
        addr
    }

    fn constraints(profile: &str) -> RenderConstraints {
        let reg = ProfileRegistry::standard();
        RenderConstraints::from_profile(reg.get(profile).unwrap(), Duration::from_millis(200))
    }

    async fn live_contexts(renderer: &ChromiumRenderer) -> usize {
        renderer
            .browser
            .execute(GetBrowserContextsParams::default())
            .await
            .unwrap()
            .result
            .browser_context_ids
            .len()
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_honors_script_flag() {
        let renderer = ChromiumRenderer::new()
            .await
            .expect("failed to create renderer");
        let c = constraints("advanced");
        let url = "data:text/html,<div id=\"r\"></div><script>document.getElementById('r').textContent='from-js'</script>";

        let on = renderer.navigate(url, &c).await.expect("navigation failed");
        assert!(on.html.contains("from-js"));

        let off = renderer
            .navigate(url, &c.without_script())
            .await
            .expect("navigation failed");
        assert!(!off.html.contains(">from-js<"));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_error_status_is_render_error() {
        let addr = serve(Duration::ZERO, |_| ("404 Not Found", "", "<h1>gone</h1>")).await;
        let renderer = ChromiumRenderer::new().await.unwrap();

        let err = renderer
            .navigate(&format!("http://{addr}/missing"), &constraints("advanced"))
            .await
            .unwrap_err();
        assert_eq!(err, RenderError::Status { code: 404 });
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_cookies_do_not_leak_between_navigations() {
        let addr = serve(Duration::ZERO, |request| {
            if request.contains("session=1") {
                ("200 OK", "", "<p>returning</p>")
            } else {
                ("200 OK", "Set-Cookie: session=1\r\n", "<p>first-visit</p>")
            }
        })
        .await;
        let renderer = ChromiumRenderer::new().await.unwrap();
        let url = format!("http://{addr}/");
        let c = constraints("advanced");

        let first = renderer.navigate(&url, &c).await.unwrap();
        assert!(first.html.contains("first-visit"));
        let second = renderer.navigate(&url, &c).await.unwrap();
        assert!(second.html.contains("first-visit"));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_dropped_navigation_releases_tab() {
        let addr = serve(Duration::from_secs(3), |_| ("200 OK", "", "<p>slow</p>")).await;
        let renderer = ChromiumRenderer::new().await.unwrap();
        let baseline = live_contexts(&renderer).await;

        let url = format!("http://{addr}/");
        let timed_out = tokio::time::timeout(
            Duration::from_millis(300),
            renderer.navigate(&url, &constraints("basic")),
        )
        .await;
        assert!(timed_out.is_err());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(live_contexts(&renderer).await, baseline);
    }
}
