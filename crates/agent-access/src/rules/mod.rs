//! Rule checks: independent, weighted evaluations of a rendered page.
//!
//! Each check targets one requirement (`FR1`..`FR6`) and is a pure function
//! of the `CheckContext`. Checks never see each other's output. The
//! `RuleRegistry` owns the weight table, validates it once at construction,
//! and isolates a panicking check so its siblings still run.

pub mod initial_payload;
pub mod metadata;
pub mod navigation;
pub mod performance;
pub mod progressive;
pub mod semantic;

use crate::error::{AccessError, AccessResult};
use crate::page::RenderedPage;
use crate::profile::CapabilityProfile;
use crate::types::RuleCheckResult;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Weights of the standard registry must sum to this.
pub const TOTAL_WEIGHT: u32 = 100;

/// Requirement id whose failures are high priority.
pub const INITIAL_PAYLOAD_REQUIREMENT: &str = "FR1";

/// Inputs every check may read.
pub struct CheckContext<'a> {
    /// Profile the pipeline runs under.
    pub profile: &'a CapabilityProfile,
    /// Snapshot rendered under `profile`.
    pub page: &'a RenderedPage,
    /// Snapshot of the same URL rendered with script forced off.
    pub initial_payload: &'a RenderedPage,
}

/// Score and findings of one check, before the registry stamps on id/weight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOutcome {
    pub score: u8,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

/// An independent evaluation of one requirement.
pub trait RuleCheck: Send + Sync {
    /// Stable requirement id, e.g. `FR1`.
    fn requirement_id(&self) -> &str;

    /// Human-readable name; doubles as recommendation category.
    fn name(&self) -> &str;

    /// Short description of what this check measures.
    fn description(&self) -> &str;

    /// Evaluate the page. Deficiencies go into `issues`, never into a panic.
    fn evaluate(&self, ctx: &CheckContext<'_>) -> CheckOutcome;
}

/// Equal-weight structural subchecks scored as a pass ratio.
#[derive(Debug, Default)]
pub struct Subchecks {
    passed: u32,
    total: u32,
    details: Vec<String>,
    issues: Vec<String>,
}

impl Subchecks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one subcheck.
    pub fn check(
        &mut self,
        ok: bool,
        pass_detail: impl Into<String>,
        fail_issue: impl Into<String>,
    ) -> &mut Self {
        self.total += 1;
        if ok {
            self.passed += 1;
            self.details.push(pass_detail.into());
        } else {
            self.issues.push(fail_issue.into());
        }
        self
    }

    /// Add an informational line that does not affect the score.
    pub fn note(&mut self, detail: impl Into<String>) -> &mut Self {
        self.details.push(detail.into());
        self
    }

    pub fn finish(self) -> CheckOutcome {
        CheckOutcome {
            score: ratio_score(self.passed, self.total),
            details: self.details,
            issues: self.issues,
        }
    }
}

/// `round(100 × passed / total)`; zero subchecks score zero.
pub fn ratio_score(passed: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    round_div(100 * u64::from(passed.min(total)), u64::from(total)) as u8
}

/// Integer division rounding half up.
pub(crate) fn round_div(numerator: u64, denominator: u64) -> u64 {
    if denominator == 0 {
        return 0;
    }
    (2 * numerator + denominator) / (2 * denominator)
}

/// A check together with its configured weight.
pub struct WeightedCheck {
    pub weight: u32,
    pub check: Box<dyn RuleCheck>,
}

impl WeightedCheck {
    pub fn new(weight: u32, check: impl RuleCheck + 'static) -> Self {
        Self {
            weight,
            check: Box::new(check),
        }
    }
}

/// Ordered, validated table of weighted checks.
pub struct RuleRegistry {
    checks: Vec<WeightedCheck>,
}

impl RuleRegistry {
    /// Build a registry from an explicit weight table.
    ///
    /// The table must be non-empty, use unique requirement ids, and have
    /// weights summing to exactly [`TOTAL_WEIGHT`].
    pub fn new(checks: Vec<WeightedCheck>) -> AccessResult<Self> {
        if checks.is_empty() {
            return Err(AccessError::InvalidConfig(
                "rule registry must not be empty".to_string(),
            ));
        }
        for (i, wc) in checks.iter().enumerate() {
            let id = wc.check.requirement_id();
            if checks[..i]
                .iter()
                .any(|other| other.check.requirement_id() == id)
            {
                return Err(AccessError::InvalidConfig(format!(
                    "duplicate requirement id: {id}"
                )));
            }
        }
        let total: u32 = checks.iter().map(|wc| wc.weight).sum();
        if total != TOTAL_WEIGHT {
            return Err(AccessError::InvalidConfig(format!(
                "rule weights sum to {total}, expected {TOTAL_WEIGHT}"
            )));
        }
        Ok(Self { checks })
    }

    /// The six built-in requirements FR1–FR6.
    pub fn standard() -> Self {
        Self {
            checks: vec![
                WeightedCheck::new(25, initial_payload::InitialPayloadCheck),
                WeightedCheck::new(20, semantic::SemanticStructureCheck),
                WeightedCheck::new(15, progressive::ProgressiveEnhancementCheck),
                WeightedCheck::new(15, metadata::MetadataCheck),
                WeightedCheck::new(15, navigation::NavigationCheck),
                WeightedCheck::new(10, performance::PerformanceCheck::default()),
            ],
        }
    }

    pub fn total_weight(&self) -> u32 {
        self.checks.iter().map(|wc| wc.weight).sum()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeightedCheck> {
        self.checks.iter()
    }

    /// Requirement ids in registration order.
    pub fn requirement_ids(&self) -> Vec<&str> {
        self.checks
            .iter()
            .map(|wc| wc.check.requirement_id())
            .collect()
    }

    /// Run every check in registration order.
    pub fn evaluate_all(&self, ctx: &CheckContext<'_>) -> Vec<RuleCheckResult> {
        self.checks
            .iter()
            .map(|wc| evaluate_isolated(wc, ctx))
            .collect()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Run one check, turning a panic into a zero-score result.
pub fn evaluate_isolated(wc: &WeightedCheck, ctx: &CheckContext<'_>) -> RuleCheckResult {
    let check = wc.check.as_ref();
    let outcome = catch_unwind(AssertUnwindSafe(|| check.evaluate(ctx))).unwrap_or_else(|panic| {
        let msg = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        tracing::warn!("check {} failed internally: {msg}", check.requirement_id());
        CheckOutcome {
            score: 0,
            details: Vec::new(),
            issues: vec![format!("Check could not be evaluated: {msg}")],
        }
    });

    let result = RuleCheckResult::new(
        check.requirement_id(),
        check.name(),
        wc.weight,
        outcome.score,
        outcome.details,
        outcome.issues,
    );
    tracing::debug!(
        "{} {}: score={} passed={}",
        result.requirement_id,
        result.name,
        result.score,
        result.passed
    );
    result
}
