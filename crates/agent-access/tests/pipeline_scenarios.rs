//! End-to-end pipeline scenarios over the static renderer.
//!
//! Covers SPA shells, server-rendered pages, timeouts, malformed task
//! selectors, batch ordering and cancellation, and profile comparison.

use std::sync::Arc;
use std::time::Duration;

use agent_access::renderer::StaticPage;
use agent_access::*;

// ─────────────────────── fixtures ───────────────────────

const SPA_SHELL: &str = r#"<!doctype html><html><head><title>App</title></head>
<body><div id="root"></div><script src="/static/js/main.js"></script>Loading...</body></html>"#;

fn server_rendered() -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <title>Northwind Outfitters</title>
  <meta name="description" content="Outdoor gear, shipped fast.">
  <script type="application/ld+json">{{"@type":"Organization","name":"Northwind"}}</script>
</head>
<body>
  <header><a href="/">Northwind</a></header>
  <nav aria-label="Primary">
    <a href="/tents">Tents</a>
    <a href="/packs">Backpacks</a>
    <a href="/contact">Contact us</a>
  </nav>
  <main>
    <h1>Gear for every trail</h1>
    <p>{}</p>
    <form action="/search" role="search">
      <label for="q">Search the catalogue</label>
      <input id="q" type="search" name="q">
    </form>
    <p>Reach us at <a href="mailto:help@northwind.test">help@northwind.test</a>.</p>
  </main>
  <footer>Northwind Outfitters</footer>
</body>
</html>"#,
        "Tents, packs and stoves tested on real expeditions. ".repeat(6)
    )
}

fn engine_over(renderer: StaticRenderer) -> Engine {
    Engine::new(Arc::new(renderer), EngineConfig::default()).unwrap()
}

// ─────────────────────── single pipelines ───────────────────────

#[tokio::test]
async fn spa_shell_fails_initial_payload_for_every_profile() {
    let engine = engine_over(StaticRenderer::new().with_variants(
        "https://spa.test/",
        server_rendered(),
        SPA_SHELL,
    ));

    for profile in ["basic", "intermediate", "advanced", "crawler"] {
        let outcome = engine.evaluate("https://spa.test/", profile, &[]).await.unwrap();
        let fr1 = &outcome.report.results["FR1"];
        assert_eq!(fr1.score, 0, "profile {profile}");
        assert!(!fr1.passed, "profile {profile}");
        assert!(outcome
            .report
            .recommendations
            .first()
            .is_some_and(|r| r.requirement_id == "FR1" && r.priority == Priority::High));
    }
}

#[tokio::test]
async fn server_rendered_page_passes_initial_payload() {
    let engine =
        engine_over(StaticRenderer::new().with_page("https://nw.test/", server_rendered()));
    let outcome = engine.evaluate("https://nw.test/", "basic", &[]).await.unwrap();

    let fr1 = &outcome.report.results["FR1"];
    assert_eq!(fr1.score, 100);
    assert!(fr1.passed);
    assert!(outcome.report.passed);
    assert!(outcome.report.error.is_none());
    assert_eq!(
        outcome.report.results.keys().cloned().collect::<Vec<_>>(),
        vec!["FR1", "FR2", "FR3", "FR4", "FR5", "FR6"]
    );
}

#[tokio::test]
async fn every_result_respects_score_bounds() {
    let engine = engine_over(
        StaticRenderer::new()
            .with_page("https://nw.test/", server_rendered())
            .with_page("https://spa.test/", SPA_SHELL),
    );
    for url in ["https://nw.test/", "https://spa.test/"] {
        let outcome = engine.evaluate(url, "advanced", &[]).await.unwrap();
        assert!(outcome.report.overall_score <= 100);
        for result in outcome.report.results.values() {
            assert!(result.score <= 100);
            assert_eq!(result.passed, result.score >= CHECK_PASS_THRESHOLD);
        }
    }
}

#[tokio::test]
async fn repeated_evaluation_is_deterministic() {
    let engine =
        engine_over(StaticRenderer::new().with_page("https://nw.test/", server_rendered()));
    let a = engine.evaluate("https://nw.test/", "crawler", &[]).await.unwrap();
    let b = engine.evaluate("https://nw.test/", "crawler", &[]).await.unwrap();
    assert_eq!(
        serde_json::to_string(&a.report.results).unwrap(),
        serde_json::to_string(&b.report.results).unwrap()
    );
}

#[tokio::test]
async fn navigation_that_never_settles_times_out() {
    let renderer = StaticRenderer::new()
        .with_page("https://hang.test/", server_rendered())
        .with_delay(Duration::from_secs(60));
    let config = EngineConfig::default()
        .with_hard_timeout(Duration::from_millis(50))
        .with_settle_ceiling(Duration::from_millis(10));
    let engine = Engine::new(Arc::new(renderer), config).unwrap();

    let outcome = engine.evaluate("https://hang.test/", "basic", &[]).await.unwrap();
    assert!(outcome.report.error.is_some());
    assert!(!outcome.report.passed);
    assert_eq!(outcome.report.overall_score, 0);
    assert!(outcome.report.results.is_empty());
    assert!(outcome.tasks.is_empty());
}

#[tokio::test]
async fn slow_timing_lowers_performance_only() {
    let page = StaticPage {
        html: server_rendered(),
        noscript_html: None,
        timing: TimingMetrics {
            dom_content_loaded: 9_000,
            load_complete: 12_000,
            total_load_time: 15_000,
            dom_element_count: 40,
        },
    };
    let engine = engine_over(StaticRenderer::new().with_static_page("https://slow.test/", page));
    let outcome = engine.evaluate("https://slow.test/", "basic", &[]).await.unwrap();
    assert_eq!(outcome.report.results["FR6"].score, 25);
    assert_eq!(outcome.report.results["FR1"].score, 100);
}

// ─────────────────────── tasks ───────────────────────

#[tokio::test]
async fn malformed_selector_is_recorded_and_valid_one_still_matches() {
    let task = Task::new("links", "Find links", &["a[href=", "nav a"], &[]).unwrap();
    let engine =
        engine_over(StaticRenderer::new().with_page("https://nw.test/", server_rendered()));
    let outcome = engine
        .evaluate("https://nw.test/", "basic", std::slice::from_ref(&task))
        .await
        .unwrap();

    let result = &outcome.tasks[0];
    assert!(result.success);
    assert_eq!(result.elements_found.len(), 1);
    assert_eq!(result.elements_found[0].count, 3);
    assert!(result.issues.iter().any(|i| i.contains("a[href=")));
}

#[tokio::test]
async fn standard_tasks_on_server_rendered_page() {
    let catalog = TaskCatalog::standard().unwrap();
    let engine =
        engine_over(StaticRenderer::new().with_page("https://nw.test/", server_rendered()));
    let outcome = engine
        .evaluate("https://nw.test/", "basic", catalog.tasks())
        .await
        .unwrap();

    let success: Vec<(&str, bool)> = outcome
        .tasks
        .iter()
        .map(|t| (t.task_name.as_str(), t.success))
        .collect();
    assert_eq!(
        success,
        vec![
            ("contact_info", true),
            ("navigation_menu", true),
            ("main_content", true),
            ("search", true),
            ("pricing", false),
        ]
    );
}

// ─────────────────────── batches ───────────────────────

#[tokio::test]
async fn batch_returns_outcomes_in_input_order() {
    let engine = engine_over(
        StaticRenderer::new()
            .with_page("https://nw.test/", server_rendered())
            .with_page("https://spa.test/", SPA_SHELL),
    );
    let units: Vec<BatchUnit> = ["basic", "advanced"]
        .into_iter()
        .flat_map(|p| {
            ["https://spa.test/", "https://gone.test/", "https://nw.test/"]
                .into_iter()
                .map(move |u| BatchUnit::new(u, p))
        })
        .collect();

    let batch = engine.run_batch(&units, &[], 2, &CancelToken::new()).await;
    assert_eq!(batch.outcomes.len(), units.len());
    for (unit, outcome) in units.iter().zip(&batch.outcomes) {
        assert_eq!(outcome.url, unit.url);
        assert_eq!(outcome.profile, unit.profile);
        assert_eq!(outcome.is_error(), unit.url == "https://gone.test/");
    }
}

#[tokio::test]
async fn cancelled_batch_reports_unstarted_units() {
    let engine =
        engine_over(StaticRenderer::new().with_page("https://nw.test/", server_rendered()));
    let units = vec![
        BatchUnit::new("https://nw.test/", "basic"),
        BatchUnit::new("https://nw.test/", "crawler"),
        BatchUnit::new("https://nw.test/", "advanced"),
    ];
    let cancel = CancelToken::new();
    cancel.cancel();

    let batch = engine.run_batch(&units, &[], 1, &cancel).await;
    assert!(batch.outcomes.is_empty());
    assert_eq!(batch.skipped.len(), 3);
}

#[tokio::test]
async fn cancel_mid_batch_lets_in_flight_pipelines_finish() {
    let engine = engine_over(
        StaticRenderer::new()
            .with_page("https://nw.test/", server_rendered())
            .with_delay(Duration::from_millis(200)),
    );
    let units: Vec<BatchUnit> = (0..6)
        .map(|_| BatchUnit::new("https://nw.test/", "basic"))
        .collect();

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let batch = engine.run_batch(&units, &[], 2, &cancel).await;
    assert_eq!(batch.outcomes.len(), 2);
    assert!(batch.outcomes.iter().all(|o| !o.is_error()));
    assert_eq!(batch.skipped.len(), 4);
}

// ─────────────────────── comparison ───────────────────────

#[tokio::test]
async fn comparison_of_spa_flags_capability_gap() {
    let catalog = TaskCatalog::standard().unwrap();
    let engine = engine_over(StaticRenderer::new().with_variants(
        "https://spa.test/",
        server_rendered(),
        SPA_SHELL,
    ));
    let comparison = ComparisonAnalyzer::new(engine)
        .compare(
            "https://spa.test/",
            &["basic", "intermediate", "advanced", "crawler"],
            catalog.tasks(),
        )
        .await
        .unwrap();

    let scores = &comparison.result.accessibility_scores;
    assert_eq!(scores.len(), 4);
    assert!(scores["basic"] < scores["advanced"]);
    assert_eq!(comparison.result.task_success_matrix["search"]["basic"], false);
    assert_eq!(comparison.result.task_success_matrix["search"]["advanced"], true);
    assert!(comparison
        .result
        .recommendations
        .iter()
        .any(|r| r.starts_with("Initial payload")));

    let json = serde_json::to_value(&comparison.result).unwrap();
    assert!(json.get("taskSuccessMatrix").is_some());
    assert!(json.get("accessibilityScores").is_some());
}
