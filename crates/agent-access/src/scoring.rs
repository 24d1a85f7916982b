//! Weighted score aggregation and recommendation generation.

use crate::rules::{round_div, INITIAL_PAYLOAD_REQUIREMENT};
use crate::types::{ComplianceReport, Priority, Recommendation, RuleCheckResult};

/// Default overall pass threshold.
pub const DEFAULT_PASS_THRESHOLD: u8 = 70;

/// Folds rule-check results into one compliance report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringAggregator {
    pass_threshold: u8,
}

impl Default for ScoringAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_PASS_THRESHOLD)
    }
}

impl ScoringAggregator {
    pub fn new(pass_threshold: u8) -> Self {
        Self { pass_threshold }
    }

    pub fn pass_threshold(&self) -> u8 {
        self.pass_threshold
    }

    /// `round(Σ weight·score / Σ weight)`; no weight at all scores zero.
    pub fn overall_score(results: &[RuleCheckResult]) -> u8 {
        let total_weight: u64 = results.iter().map(|r| u64::from(r.weight)).sum();
        let weighted: u64 = results
            .iter()
            .map(|r| u64::from(r.weight) * u64::from(r.score))
            .sum();
        round_div(weighted, total_weight).min(100) as u8
    }

    /// One recommendation per issue of every failed result.
    ///
    /// `results` must be in registration order. High priority sorts first;
    /// the sort is stable so registration and issue order survive within a
    /// tier.
    pub fn recommendations(results: &[RuleCheckResult]) -> Vec<Recommendation> {
        let mut recs: Vec<Recommendation> = results
            .iter()
            .filter(|r| !r.passed)
            .flat_map(|r| {
                let priority = if r.requirement_id == INITIAL_PAYLOAD_REQUIREMENT {
                    Priority::High
                } else {
                    Priority::Medium
                };
                r.issues.iter().map(move |issue| Recommendation {
                    requirement_id: r.requirement_id.clone(),
                    priority,
                    issue: issue.clone(),
                    category: r.name.clone(),
                })
            })
            .collect();
        recs.sort_by_key(|r| r.priority);
        recs
    }

    /// Build the report for one `(url, profile)` run.
    pub fn aggregate(
        &self,
        url: &str,
        profile: &str,
        results: Vec<RuleCheckResult>,
    ) -> ComplianceReport {
        let overall_score = Self::overall_score(&results);
        let recommendations = Self::recommendations(&results);
        ComplianceReport {
            url: url.to_string(),
            profile: profile.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            results: results
                .into_iter()
                .map(|r| (r.requirement_id.clone(), r))
                .collect(),
            overall_score,
            passed: overall_score >= self.pass_threshold,
            recommendations,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleRegistry;

    fn result(id: &str, weight: u32, score: u8, issues: &[&str]) -> RuleCheckResult {
        RuleCheckResult::new(
            id,
            format!("{id} name"),
            weight,
            score,
            Vec::new(),
            issues.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn standard_results(score: u8) -> Vec<RuleCheckResult> {
        RuleRegistry::standard()
            .iter()
            .map(|wc| result(wc.check.requirement_id(), wc.weight, score, &["x"]))
            .collect()
    }

    #[test]
    fn test_all_perfect_scores_100() {
        let report = ScoringAggregator::default().aggregate("u", "basic", standard_results(100));
        assert_eq!(report.overall_score, 100);
        assert!(report.passed);
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_all_zero_scores_0() {
        let report = ScoringAggregator::default().aggregate("u", "basic", standard_results(0));
        assert_eq!(report.overall_score, 0);
        assert!(!report.passed);
        assert_eq!(report.results.len(), 6);
    }

    #[test]
    fn test_weighted_mean_rounds_half_up() {
        // (25·100 + 75·50) / 100 = 62.5 → 63
        let results = vec![result("A", 25, 100, &[]), result("B", 75, 50, &[])];
        assert_eq!(ScoringAggregator::overall_score(&results), 63);
        // (1·0 + 2·100) / 3 = 66.67 → 67
        let results = vec![result("A", 1, 0, &[]), result("B", 2, 100, &[])];
        assert_eq!(ScoringAggregator::overall_score(&results), 67);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let results = vec![result("A", 100, 65, &[])];
        assert!(!ScoringAggregator::default().aggregate("u", "p", results.clone()).passed);
        assert!(ScoringAggregator::new(60).aggregate("u", "p", results).passed);
    }

    #[test]
    fn test_empty_results_fail() {
        let report = ScoringAggregator::default().aggregate("u", "p", Vec::new());
        assert_eq!(report.overall_score, 0);
        assert!(!report.passed);
    }

    #[test]
    fn test_recommendation_order() {
        let results = vec![
            result("FR2", 20, 40, &["fr2-a", "fr2-b"]),
            result("FR3", 15, 90, &["passed-so-ignored"]),
            result("FR1", 25, 0, &["fr1-a", "fr1-b"]),
            result("FR5", 15, 25, &["fr5-a"]),
        ];
        let recs = ScoringAggregator::recommendations(&results);
        let issues: Vec<&str> = recs.iter().map(|r| r.issue.as_str()).collect();
        assert_eq!(issues, vec!["fr1-a", "fr1-b", "fr2-a", "fr2-b", "fr5-a"]);
        assert_eq!(recs[0].priority, Priority::High);
        assert_eq!(recs[2].priority, Priority::Medium);
        assert_eq!(recs[2].category, "FR2 name");
    }
}
