//! The `(url, profile)` pipeline and bounded-parallel batches of it.
//!
//! A pipeline renders the page under the profile (plus a forced no-script
//! render when the profile runs script), then scores the snapshots
//! synchronously. All navigation for one pipeline shares a single hard
//! deadline; a breach yields an error report with no partial results.

use crate::config::EngineConfig;
use crate::error::{AccessResult, RenderError};
use crate::page::RenderedPage;
use crate::profile::{CapabilityProfile, ProfileRegistry};
use crate::renderer::{PageRenderer, PageSource, RenderConstraints};
use crate::rules::{CheckContext, RuleRegistry};
use crate::scoring::ScoringAggregator;
use crate::tasks::Task;
use crate::types::{BatchOutcome, BatchUnit, ComplianceReport, PipelineOutcome};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Cooperative cancellation flag for batches.
///
/// Cancelling stops new pipelines from being issued; in-flight pipelines run
/// to completion or timeout.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Raw payloads gathered by one pipeline before parsing.
struct RenderedSources {
    rendered: PageSource,
    /// `None` when the profile already runs without script.
    initial: Option<PageSource>,
}

/// Runs pipelines against a renderer with read-only registries.
#[derive(Clone)]
pub struct Engine {
    renderer: Arc<dyn PageRenderer>,
    profiles: Arc<ProfileRegistry>,
    rules: Arc<RuleRegistry>,
    aggregator: ScoringAggregator,
    config: EngineConfig,
}

impl Engine {
    /// Engine with the standard profile and rule registries.
    pub fn new(renderer: Arc<dyn PageRenderer>, config: EngineConfig) -> AccessResult<Self> {
        Self::with_registries(
            renderer,
            ProfileRegistry::standard(),
            RuleRegistry::standard(),
            config,
        )
    }

    pub fn with_registries(
        renderer: Arc<dyn PageRenderer>,
        profiles: ProfileRegistry,
        rules: RuleRegistry,
        config: EngineConfig,
    ) -> AccessResult<Self> {
        config.validate()?;
        Ok(Self {
            renderer,
            profiles: Arc::new(profiles),
            rules: Arc::new(rules),
            aggregator: ScoringAggregator::new(config.pass_threshold),
            config,
        })
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one pipeline.
    ///
    /// Fails only for an unknown profile. Render failures and timeouts come
    /// back as an outcome whose report carries `error`.
    pub async fn evaluate(
        &self,
        url: &str,
        profile_id: &str,
        tasks: &[Task],
    ) -> AccessResult<PipelineOutcome> {
        let profile = self.profiles.get(profile_id)?.clone();
        let start = Instant::now();
        info!("evaluating {url} as '{}' via {}", profile.id, self.renderer.name());

        let deadline = self.config.hard_timeout;
        let sources = match tokio::time::timeout(deadline, self.render(url, &profile)).await {
            Ok(Ok(sources)) => sources,
            Ok(Err(e)) => {
                warn!("render failed for {url} as '{}': {e}", profile.id);
                return Ok(failed_outcome(url, &profile.id, &e));
            }
            Err(_) => {
                let e = RenderError::Timeout {
                    ms: deadline.as_millis() as u64,
                };
                warn!("render timed out for {url} as '{}': {e}", profile.id);
                return Ok(failed_outcome(url, &profile.id, &e));
            }
        };

        let outcome = self.score(url, &profile, &sources, tasks);
        info!(
            "evaluated {url} as '{}': score={} passed={} in {}ms",
            profile.id,
            outcome.report.overall_score,
            outcome.report.passed,
            start.elapsed().as_millis()
        );
        Ok(outcome)
    }

    async fn render(
        &self,
        url: &str,
        profile: &CapabilityProfile,
    ) -> Result<RenderedSources, RenderError> {
        let constraints = RenderConstraints::from_profile(profile, self.config.settle_ceiling);
        let rendered = self.renderer.navigate(url, &constraints).await?;
        let initial = if constraints.script_enabled {
            debug!("forced no-script render of {url}");
            Some(
                self.renderer
                    .navigate(url, &constraints.without_script())
                    .await?,
            )
        } else {
            None
        };
        Ok(RenderedSources { rendered, initial })
    }

    /// Parse and score. Synchronous: parsed pages are `!Send`.
    fn score(
        &self,
        url: &str,
        profile: &CapabilityProfile,
        sources: &RenderedSources,
        tasks: &[Task],
    ) -> PipelineOutcome {
        let page = RenderedPage::from_source(&sources.rendered);
        let initial = sources.initial.as_ref().map(RenderedPage::from_source);
        let ctx = CheckContext {
            profile,
            page: &page,
            initial_payload: initial.as_ref().unwrap_or(&page),
        };

        let results = self.rules.evaluate_all(&ctx);
        let report = self.aggregator.aggregate(url, &profile.id, results);
        let tasks = tasks.iter().map(|t| t.execute(&page)).collect();

        PipelineOutcome {
            url: url.to_string(),
            profile: profile.id.clone(),
            report,
            tasks,
        }
    }

    /// Run a unit, folding an unknown profile into an error outcome.
    async fn evaluate_unit(&self, unit: &BatchUnit, tasks: &[Task]) -> PipelineOutcome {
        match self.evaluate(&unit.url, &unit.profile, tasks).await {
            Ok(outcome) => outcome,
            Err(e) => PipelineOutcome {
                url: unit.url.clone(),
                profile: unit.profile.clone(),
                report: ComplianceReport::failed(&unit.url, &unit.profile, e.to_string()),
                tasks: Vec::new(),
            },
        }
    }

    /// Run many pipelines with at most `concurrency` in flight.
    ///
    /// Outcomes come back in input order. One unit's failure never stops the
    /// others. After `cancel` fires no further units start; those are listed
    /// in `skipped`.
    pub async fn run_batch(
        &self,
        units: &[BatchUnit],
        tasks: &[Task],
        concurrency: usize,
        cancel: &CancelToken,
    ) -> BatchOutcome {
        let limit = concurrency.max(1);
        info!("batch of {} pipeline(s), concurrency {limit}", units.len());

        let mut finished: Vec<(usize, PipelineOutcome)> = stream::iter(units.iter().enumerate())
            .take_while(|_| futures::future::ready(!cancel.is_cancelled()))
            .map(|(i, unit)| async move { (i, self.evaluate_unit(unit, tasks).await) })
            .buffer_unordered(limit)
            .collect()
            .await;
        finished.sort_by_key(|(i, _)| *i);

        let done: HashSet<usize> = finished.iter().map(|(i, _)| *i).collect();
        let skipped: Vec<BatchUnit> = units
            .iter()
            .enumerate()
            .filter(|(i, _)| !done.contains(i))
            .map(|(_, u)| u.clone())
            .collect();
        if !skipped.is_empty() {
            warn!("batch cancelled; {} pipeline(s) not started", skipped.len());
        }

        BatchOutcome {
            outcomes: finished.into_iter().map(|(_, o)| o).collect(),
            skipped,
        }
    }
}

fn failed_outcome(url: &str, profile: &str, error: &RenderError) -> PipelineOutcome {
    PipelineOutcome {
        url: url.to_string(),
        profile: profile.to_string(),
        report: ComplianceReport::failed(url, profile, error.to_string()),
        tasks: Vec::new(),
    }
}
