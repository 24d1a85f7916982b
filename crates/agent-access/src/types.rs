//! Core data types produced by the engine.
//!
//! Every type here is a plain value that serializes with the camelCase field
//! names report renderers rely on. Nothing in this module knows how pages are
//! rendered or scored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Score at or above which a single rule check passes.
pub const CHECK_PASS_THRESHOLD: u8 = 70;

/// An element matched by a selector, reduced to the fields checks need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    pub tag: String,
    pub text: String,
    pub href: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

impl ElementDescriptor {
    /// Look up an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether the attribute is present and not blank.
    pub fn has_attr_value(&self, name: &str) -> bool {
        self.attr(name).is_some_and(|v| !v.trim().is_empty())
    }
}

/// Navigation timing of a rendered page, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingMetrics {
    pub dom_content_loaded: u64,
    pub load_complete: u64,
    pub total_load_time: u64,
    pub dom_element_count: u64,
}

/// Result of one rule check against one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCheckResult {
    pub requirement_id: String,
    pub name: String,
    pub weight: u32,
    pub score: u8,
    pub passed: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl RuleCheckResult {
    /// Build a result, clamping the score and deriving `passed` from it.
    pub fn new(
        requirement_id: impl Into<String>,
        name: impl Into<String>,
        weight: u32,
        score: u8,
        details: Vec<String>,
        issues: Vec<String>,
    ) -> Self {
        let score = score.min(100);
        Self {
            requirement_id: requirement_id.into(),
            name: name.into(),
            weight,
            score,
            passed: score >= CHECK_PASS_THRESHOLD,
            details,
            issues,
        }
    }
}

/// Urgency of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
}

/// One actionable fix derived from a failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub requirement_id: String,
    pub priority: Priority,
    pub issue: String,
    pub category: String,
}

/// Weighted compliance score of one page under one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub url: String,
    pub profile: String,
    pub timestamp: String,
    pub results: BTreeMap<String, RuleCheckResult>,
    pub overall_score: u8,
    pub passed: bool,
    pub recommendations: Vec<Recommendation>,
    /// Set only when the page could not be rendered; `results` is then empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComplianceReport {
    /// A report for a pipeline whose render failed.
    pub fn failed(
        url: impl Into<String>,
        profile: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            profile: profile.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            results: BTreeMap::new(),
            overall_score: 0,
            passed: false,
            recommendations: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Match count of one selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorHit {
    pub selector: String,
    pub count: usize,
}

/// Matches of one text pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternHit {
    pub pattern: String,
    pub matches: Vec<String>,
}

/// Contact information found by a contact task, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactBreakdown {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub addresses: Vec<String>,
}

impl ContactBreakdown {
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.phones.is_empty() && self.addresses.is_empty()
    }
}

/// Outcome of running one task against one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub task_name: String,
    pub success: bool,
    pub elements_found: Vec<SelectorHit>,
    pub text_matches: Vec<PatternHit>,
    /// First few matched elements per selector.
    pub samples: BTreeMap<String, Vec<ElementDescriptor>>,
    pub details: Vec<String>,
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactBreakdown>,
}

/// Cross-profile comparison of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub task_success_matrix: BTreeMap<String, BTreeMap<String, bool>>,
    pub accessibility_scores: BTreeMap<String, u8>,
    pub recommendations: Vec<String>,
}

/// Everything one `(url, profile)` pipeline produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub url: String,
    pub profile: String,
    pub report: ComplianceReport,
    pub tasks: Vec<TaskResult>,
}

impl PipelineOutcome {
    pub fn is_error(&self) -> bool {
        self.report.is_error()
    }
}

/// Results of a batch run, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub outcomes: Vec<PipelineOutcome>,
    /// Units never started because the batch was cancelled.
    pub skipped: Vec<BatchUnit>,
}

/// A single `(url, profile)` unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchUnit {
    pub url: String,
    pub profile: String,
}

impl BatchUnit {
    pub fn new(url: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            profile: profile.into(),
        }
    }
}

/// Multi-profile runs of one page together with their comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileComparison {
    pub url: String,
    pub runs: Vec<PipelineOutcome>,
    pub result: ComparisonResult,
}
