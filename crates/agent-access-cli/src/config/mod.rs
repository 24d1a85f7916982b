//! Configuration resolution and renderer selection.
//!
//! Precedence for every engine setting: command-line flag, then the
//! `AGENT_ACCESS_*` environment variables, then built-in defaults.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;

use agent_access::{EngineConfig, HttpRenderer, PageRenderer, StaticRenderer};

/// Which rendering backend drives navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RendererKind {
    /// Plain HTTP fetch; scripts never run.
    #[default]
    Http,
    /// Headless Chromium over CDP (requires the `chromium` feature).
    Chromium,
}

/// Engine settings given on the command line.
#[derive(Debug, Clone, Default)]
pub struct EngineOverrides {
    pub timeout_ms: Option<u64>,
    pub settle_ceiling_ms: Option<u64>,
    pub threshold: Option<u8>,
    pub concurrency: Option<usize>,
}

/// Layer command-line overrides over the environment-derived config.
pub fn resolve_engine_config(overrides: &EngineOverrides) -> anyhow::Result<EngineConfig> {
    resolve_from(EngineConfig::from_env(), overrides)
}

fn resolve_from(base: EngineConfig, overrides: &EngineOverrides) -> anyhow::Result<EngineConfig> {
    let mut config = base;
    if let Some(ms) = overrides.timeout_ms {
        config = config.with_hard_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = overrides.settle_ceiling_ms {
        config = config.with_settle_ceiling(Duration::from_millis(ms));
    }
    if let Some(threshold) = overrides.threshold {
        config = config.with_pass_threshold(threshold);
    }
    if let Some(concurrency) = overrides.concurrency {
        config = config.with_concurrency(concurrency);
    }
    config.validate().context("invalid engine configuration")?;
    Ok(config)
}

/// Build the renderer for this invocation.
///
/// With `html` set, the saved page is served for every URL in `urls` and no
/// network access happens.
pub async fn build_renderer(
    kind: RendererKind,
    html: Option<&Path>,
    urls: &[String],
    config: &EngineConfig,
) -> anyhow::Result<Arc<dyn PageRenderer>> {
    if let Some(path) = html {
        return Ok(Arc::new(static_renderer(path, urls)?));
    }

    match kind {
        RendererKind::Http => {
            let renderer = HttpRenderer::new(config.hard_timeout.as_millis() as u64)
                .context("failed to create HTTP renderer")?;
            Ok(Arc::new(renderer))
        }
        RendererKind::Chromium => chromium_renderer().await,
    }
}

fn static_renderer(path: &Path, urls: &[String]) -> anyhow::Result<StaticRenderer> {
    let mut renderer = StaticRenderer::new();
    for url in urls {
        renderer = renderer
            .with_file(url.as_str(), path)
            .with_context(|| format!("failed to read {}", path.display()))?;
    }
    Ok(renderer)
}

#[cfg(feature = "chromium")]
async fn chromium_renderer() -> anyhow::Result<Arc<dyn PageRenderer>> {
    let renderer = agent_access::renderer::chromium::ChromiumRenderer::new()
        .await
        .context("failed to launch Chromium")?;
    Ok(Arc::new(renderer))
}

#[cfg(not(feature = "chromium"))]
async fn chromium_renderer() -> anyhow::Result<Arc<dyn PageRenderer>> {
    anyhow::bail!("this build has no Chromium support; rebuild with `--features chromium` or use `--renderer http`")
}

/// Read newline-separated URLs from a file, skipping blanks and `#` comments.
pub fn read_url_list(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read URL list {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_access::RenderConstraints;
    use std::io::Write;

    #[test]
    fn test_overrides_win() {
        let overrides = EngineOverrides {
            timeout_ms: Some(12_000),
            settle_ceiling_ms: Some(2_000),
            threshold: Some(80),
            concurrency: Some(8),
        };
        let config = resolve_from(EngineConfig::default(), &overrides).unwrap();
        assert_eq!(config.hard_timeout, Duration::from_millis(12_000));
        assert_eq!(config.settle_ceiling, Duration::from_millis(2_000));
        assert_eq!(config.pass_threshold, 80);
        assert_eq!(config.concurrency, 8);
    }

    #[test]
    fn test_inconsistent_overrides_rejected() {
        let overrides = EngineOverrides {
            timeout_ms: Some(1_000),
            settle_ceiling_ms: Some(5_000),
            ..EngineOverrides::default()
        };
        assert!(resolve_from(EngineConfig::default(), &overrides).is_err());
    }

    #[test]
    fn test_url_list_skips_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# sites\nhttps://a.test/\n\n  https://b.test/  ").unwrap();
        let urls = read_url_list(file.path()).unwrap();
        assert_eq!(urls, vec!["https://a.test/", "https://b.test/"]);
    }

    #[tokio::test]
    async fn test_saved_html_serves_every_url() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<main><h1>Saved</h1></main>").unwrap();
        let urls = vec!["https://a.test/".to_string(), "https://b.test/".to_string()];
        let renderer = build_renderer(
            RendererKind::Http,
            Some(file.path()),
            &urls,
            &EngineConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(renderer.name(), "static");
        let constraints = RenderConstraints {
            script_enabled: false,
            css_enabled: false,
            images_enabled: false,
            cookies_enabled: false,
            user_agent: "test".to_string(),
            settle_wait: Duration::ZERO,
        };
        let page = renderer.navigate("https://b.test/", &constraints).await.unwrap();
        assert!(page.html.contains("Saved"));
    }

    #[cfg(not(feature = "chromium"))]
    #[tokio::test]
    async fn test_chromium_without_feature_errors() {
        let result =
            build_renderer(RendererKind::Chromium, None, &[], &EngineConfig::default()).await;
        assert!(result.is_err());
    }
}
