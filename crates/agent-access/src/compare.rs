//! Cross-profile comparison of one page.

use crate::error::AccessResult;
use crate::pipeline::Engine;
use crate::tasks::Task;
use crate::types::{ComparisonResult, PipelineOutcome, ProfileComparison};
use std::collections::BTreeMap;
use tracing::{info, warn};

pub const BASIC_PROFILE: &str = "basic";
pub const ADVANCED_PROFILE: &str = "advanced";

/// Basic-profile score below which the initial payload needs work.
pub const MIN_BASIC_SCORE: u8 = 70;
/// Largest tolerated advanced-over-basic score gap.
pub const MAX_CAPABILITY_GAP: u8 = 30;

/// Task name → profile id → success.
pub type TaskMatrix = BTreeMap<String, BTreeMap<String, bool>>;

/// Runs the pipeline once per profile and diffs the outcomes.
#[derive(Clone)]
pub struct ComparisonAnalyzer {
    engine: Engine,
}

impl ComparisonAnalyzer {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    /// Compare `url` across `profile_ids`, one profile at a time.
    ///
    /// Every profile id is resolved before anything renders. A profile whose
    /// render fails scores 0 with every task unsuccessful; the rest still run.
    pub async fn compare(
        &self,
        url: &str,
        profile_ids: &[&str],
        tasks: &[Task],
    ) -> AccessResult<ProfileComparison> {
        for id in profile_ids {
            self.engine.profiles().get(id)?;
        }
        info!("comparing {url} across {} profile(s)", profile_ids.len());

        let mut runs = Vec::with_capacity(profile_ids.len());
        for id in profile_ids {
            let outcome = self.engine.evaluate(url, id, tasks).await?;
            if let Some(err) = &outcome.report.error {
                warn!("profile '{id}' failed during comparison: {err}");
            }
            runs.push(outcome);
        }

        let result = summarize(&runs, tasks);
        Ok(ProfileComparison {
            url: url.to_string(),
            runs,
            result,
        })
    }
}

/// Build scores, the task matrix and recommendations from finished runs.
pub fn summarize(runs: &[PipelineOutcome], tasks: &[Task]) -> ComparisonResult {
    let accessibility_scores: BTreeMap<String, u8> = runs
        .iter()
        .map(|r| (r.profile.clone(), r.report.overall_score))
        .collect();

    let mut task_success_matrix = TaskMatrix::new();
    for task in tasks {
        let row = task_success_matrix.entry(task.name.clone()).or_default();
        for run in runs {
            let success = run
                .tasks
                .iter()
                .find(|t| t.task_name == task.name)
                .is_some_and(|t| t.success);
            row.insert(run.profile.clone(), success);
        }
    }

    let order: Vec<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
    let recommendations = analyze_in_order(&accessibility_scores, &task_success_matrix, &order);
    ComparisonResult {
        task_success_matrix,
        accessibility_scores,
        recommendations,
    }
}

/// Comparison recommendations, in rule order, with per-task entries in task
/// name order.
///
/// Rules referring to a profile missing from `scores` (or a task row missing
/// either profile) are skipped.
pub fn analyze(scores: &BTreeMap<String, u8>, matrix: &TaskMatrix) -> Vec<String> {
    let order: Vec<&str> = matrix.keys().map(String::as_str).collect();
    analyze_in_order(scores, matrix, &order)
}

/// Like [`analyze`], but per-task entries follow `task_order`. Rows missing
/// from `task_order` come last, by name.
pub fn analyze_in_order(
    scores: &BTreeMap<String, u8>,
    matrix: &TaskMatrix,
    task_order: &[&str],
) -> Vec<String> {
    let mut recs = Vec::new();
    let basic = scores.get(BASIC_PROFILE).copied();
    let advanced = scores.get(ADVANCED_PROFILE).copied();

    if let Some(basic) = basic.filter(|b| *b < MIN_BASIC_SCORE) {
        recs.push(format!(
            "Initial payload: basic agents score {basic}/100. Server-render core content, headings and landmarks so they exist without JavaScript"
        ));
    }

    if let (Some(basic), Some(advanced)) = (basic, advanced) {
        let gap = advanced.saturating_sub(basic);
        if gap > MAX_CAPABILITY_GAP {
            recs.push(format!(
                "Progressive enhancement: advanced agents score {gap} points higher than basic agents ({advanced} vs {basic}). Make essential content and links work before scripts run"
            ));
        }
    }

    let rest = matrix
        .keys()
        .map(String::as_str)
        .filter(|name| !task_order.contains(name));
    let mut seen: Vec<&str> = Vec::with_capacity(matrix.len());
    for task in task_order.iter().copied().chain(rest) {
        if seen.contains(&task) {
            continue;
        }
        seen.push(task);
        let Some(row) = matrix.get(task) else {
            continue;
        };
        let basic_ok = row.get(BASIC_PROFILE);
        let advanced_ok = row.get(ADVANCED_PROFILE);
        if basic_ok == Some(&false) && advanced_ok == Some(&true) {
            recs.push(format!(
                "Semantic markup for '{task}': it succeeds only with script. Expose it in the initial HTML using semantic elements"
            ));
        }
    }

    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::renderer::StaticRenderer;
    use crate::tasks::TaskCatalog;
    use std::sync::Arc;

    fn scores(pairs: &[(&str, u8)]) -> BTreeMap<String, u8> {
        pairs.iter().map(|(p, s)| (p.to_string(), *s)).collect()
    }

    #[test]
    fn test_capability_gap_recommends_progressive_enhancement() {
        let recs = analyze(
            &scores(&[("basic", 40), ("advanced", 85)]),
            &TaskMatrix::new(),
        );
        assert_eq!(recs.len(), 2);
        assert!(recs[0].starts_with("Initial payload"));
        assert!(recs[1].starts_with("Progressive enhancement"));
        assert!(recs[1].contains("45 points"));
    }

    #[test]
    fn test_close_scores_need_nothing() {
        let recs = analyze(
            &scores(&[("basic", 80), ("advanced", 100)]),
            &TaskMatrix::new(),
        );
        assert!(recs.is_empty());
    }

    #[test]
    fn test_missing_profiles_skip_rules() {
        let recs = analyze(&scores(&[("advanced", 100)]), &TaskMatrix::new());
        assert!(recs.is_empty());

        let recs = analyze(&scores(&[("basic", 10)]), &TaskMatrix::new());
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn test_script_only_task_flagged() {
        let mut matrix = TaskMatrix::new();
        matrix.insert(
            "search".to_string(),
            [("basic".to_string(), false), ("advanced".to_string(), true)]
                .into_iter()
                .collect(),
        );
        matrix.insert(
            "pricing".to_string(),
            [("basic".to_string(), false), ("advanced".to_string(), false)]
                .into_iter()
                .collect(),
        );
        let recs = analyze(&scores(&[("basic", 90), ("advanced", 95)]), &matrix);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].contains("'search'"));
    }

    #[test]
    fn test_task_recommendations_follow_caller_order() {
        let script_only: BTreeMap<String, bool> =
            [("basic".to_string(), false), ("advanced".to_string(), true)]
                .into_iter()
                .collect();
        let mut matrix = TaskMatrix::new();
        for task in ["search", "contact_info", "pricing"] {
            matrix.insert(task.to_string(), script_only.clone());
        }
        let scores = scores(&[("basic", 90), ("advanced", 95)]);

        let recs = analyze_in_order(&scores, &matrix, &["search", "pricing"]);
        let named: Vec<&str> = recs.iter().filter_map(|r| r.split('\'').nth(1)).collect();
        assert_eq!(named, vec!["search", "pricing", "contact_info"]);

        let recs = analyze(&scores, &matrix);
        assert!(recs[0].contains("'contact_info'"));
    }

    #[tokio::test]
    async fn test_failed_profile_scores_zero_and_others_continue() {
        let spa = r#"<html><body><div id="root"></div></body></html>"#;
        let full = r#"<html lang="en"><head><title>Shop</title></head><body>
            <nav><a href="/">Home</a></nav><main><h1>Shop</h1>
            <form action="/search"><input type="search" name="q" aria-label="Search"></form>
            </main></body></html>"#;
        let renderer = StaticRenderer::new().with_variants("https://shop.test/", full, spa);
        let engine = Engine::new(Arc::new(renderer), EngineConfig::default()).unwrap();
        let catalog = TaskCatalog::standard().unwrap();
        let tasks = catalog.select(&["search"]).unwrap();

        let comparison = ComparisonAnalyzer::new(engine)
            .compare("https://shop.test/", &["basic", "advanced"], &tasks)
            .await
            .unwrap();

        assert_eq!(comparison.runs.len(), 2);
        let matrix = &comparison.result.task_success_matrix["search"];
        assert_eq!(matrix["basic"], false);
        assert_eq!(matrix["advanced"], true);
        assert!(comparison
            .result
            .recommendations
            .iter()
            .any(|r| r.contains("'search'")));
    }

    #[tokio::test]
    async fn test_render_failure_is_isolated() {
        let engine =
            Engine::new(Arc::new(StaticRenderer::new()), EngineConfig::default()).unwrap();
        let catalog = TaskCatalog::standard().unwrap();
        let comparison = ComparisonAnalyzer::new(engine)
            .compare("https://down.test/", &["basic", "crawler"], catalog.tasks())
            .await
            .unwrap();

        assert!(comparison.runs.iter().all(|r| r.is_error()));
        assert_eq!(comparison.result.accessibility_scores["basic"], 0);
        assert_eq!(comparison.result.accessibility_scores["crawler"], 0);
        assert!(comparison
            .result
            .task_success_matrix
            .values()
            .all(|row| row.values().all(|ok| !ok)));
    }

    #[tokio::test]
    async fn test_unknown_profile_rejected_before_rendering() {
        let renderer = Arc::new(StaticRenderer::new());
        let engine = Engine::new(renderer.clone(), EngineConfig::default()).unwrap();
        let err = ComparisonAnalyzer::new(engine)
            .compare("https://a.test/", &["basic", "ghost"], &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
        assert!(renderer.navigations().is_empty());
    }
}
