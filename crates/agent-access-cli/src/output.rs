//! Human-readable and JSON rendering of engine results.

use std::fmt::Write;

use serde::Serialize;

use agent_access::{
    BatchOutcome, ComplianceReport, PipelineOutcome, Priority, ProfileComparison,
    ProfileRegistry, RuleRegistry, TaskCatalog, TaskResult,
};

/// Pretty JSON for any serializable result.
pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn priority_label(p: Priority) -> &'static str {
    match p {
        Priority::High => "HIGH",
        Priority::Medium => "MEDIUM",
    }
}

fn verdict(passed: bool) -> &'static str {
    if passed {
        "PASS"
    } else {
        "FAIL"
    }
}

pub fn format_report(report: &ComplianceReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", report.url, report.profile);

    if let Some(err) = &report.error {
        let _ = writeln!(out, "  ERROR: {err}");
        let _ = writeln!(out, "  Overall: 0/100 FAIL");
        return out;
    }

    let _ = writeln!(
        out,
        "  Overall: {}/100 {}",
        report.overall_score,
        verdict(report.passed)
    );
    for result in report.results.values() {
        let _ = writeln!(
            out,
            "  {:<4} {:<32} {:>3}/100 (weight {:>2}) {}",
            result.requirement_id,
            result.name,
            result.score,
            result.weight,
            verdict(result.passed)
        );
    }

    if !report.recommendations.is_empty() {
        let _ = writeln!(out, "  Recommendations:");
        for rec in &report.recommendations {
            let _ = writeln!(
                out,
                "    [{}] {} {}: {}",
                priority_label(rec.priority),
                rec.requirement_id,
                rec.category,
                rec.issue
            );
        }
    }
    out
}

fn format_task(task: &TaskResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "    {:<16} {}",
        task.task_name,
        if task.success { "found" } else { "not found" }
    );
    for detail in &task.details {
        let _ = writeln!(out, "      {detail}");
    }
    for issue in &task.issues {
        let _ = writeln!(out, "      ! {issue}");
    }
    if let Some(contact) = task.contact.as_ref().filter(|c| !c.is_empty()) {
        for (label, values) in [
            ("emails", &contact.emails),
            ("phones", &contact.phones),
            ("addresses", &contact.addresses),
        ] {
            if !values.is_empty() {
                let _ = writeln!(out, "      {label}: {}", values.join(", "));
            }
        }
    }
    out
}

pub fn format_outcome(outcome: &PipelineOutcome) -> String {
    let mut out = format_report(&outcome.report);
    if !outcome.tasks.is_empty() {
        let _ = writeln!(out, "  Tasks:");
        for task in &outcome.tasks {
            out.push_str(&format_task(task));
        }
    }
    out
}

pub fn format_batch(batch: &BatchOutcome) -> String {
    let mut out = String::new();
    for outcome in &batch.outcomes {
        out.push_str(&format_outcome(outcome));
    }
    let passed = batch.outcomes.iter().filter(|o| o.report.passed).count();
    let failed = batch.outcomes.iter().filter(|o| o.is_error()).count();
    let _ = writeln!(
        out,
        "{} evaluated, {passed} passed, {failed} could not be rendered",
        batch.outcomes.len()
    );
    if !batch.skipped.is_empty() {
        let _ = writeln!(out, "{} skipped after cancellation:", batch.skipped.len());
        for unit in &batch.skipped {
            let _ = writeln!(out, "  {} [{}]", unit.url, unit.profile);
        }
    }
    out
}

pub fn format_comparison(comparison: &ProfileComparison) -> String {
    let result = &comparison.result;
    let mut out = String::new();
    let _ = writeln!(out, "{}", comparison.url);

    let _ = writeln!(out, "  Scores:");
    for run in &comparison.runs {
        let note = run
            .report
            .error
            .as_deref()
            .map(|e| format!(" (error: {e})"))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "    {:<14} {:>3}/100{note}",
            run.profile, run.report.overall_score
        );
    }

    if !result.task_success_matrix.is_empty() {
        let profiles: Vec<&str> = comparison.runs.iter().map(|r| r.profile.as_str()).collect();
        let _ = write!(out, "  {:<18}", "Task");
        for p in &profiles {
            let _ = write!(out, " {p:<13}");
        }
        let _ = writeln!(out);
        for (task, row) in &result.task_success_matrix {
            let _ = write!(out, "  {task:<18}");
            for p in &profiles {
                let mark = match row.get(*p) {
                    Some(true) => "yes",
                    Some(false) => "no",
                    None => "-",
                };
                let _ = write!(out, " {mark:<13}");
            }
            let _ = writeln!(out);
        }
    }

    if !result.recommendations.is_empty() {
        let _ = writeln!(out, "  Recommendations:");
        for rec in &result.recommendations {
            let _ = writeln!(out, "    - {rec}");
        }
    }
    out
}

pub fn format_profiles(profiles: &ProfileRegistry) -> String {
    let mut out = String::new();
    for p in profiles.iter() {
        let flag = |on: bool| if on { "on" } else { "off" };
        let wait = p
            .max_script_wait_ms
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "none".to_string());
        let _ = writeln!(
            out,
            "{:<14} {:<28} script={:<3} css={:<3} images={:<3} cookies={:<3} wait={wait}",
            p.id,
            p.name,
            flag(p.script_enabled),
            flag(p.css_enabled),
            flag(p.images_enabled),
            flag(p.cookies_enabled)
        );
        let _ = writeln!(out, "{:<14} UA: {}", "", p.synthetic_user_agent);
    }
    out
}

pub fn format_rules(rules: &RuleRegistry) -> String {
    let mut out = String::new();
    for wc in rules.iter() {
        let _ = writeln!(
            out,
            "{:<4} {:>3}  {:<32} {}",
            wc.check.requirement_id(),
            wc.weight,
            wc.check.name(),
            wc.check.description()
        );
    }
    out
}

pub fn format_tasks(catalog: &TaskCatalog) -> String {
    let mut out = String::new();
    for task in catalog.iter() {
        let _ = writeln!(out, "{:<16} {}", task.name, task.description);
        let _ = writeln!(out, "{:<16} selectors: {}", "", task.selectors.join(", "));
    }
    out
}
