//! FR6: Load performance within an agent's patience.

use super::{CheckContext, CheckOutcome, RuleCheck, Subchecks};

/// Timing budgets; every field is an inclusive upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerformanceCheck {
    pub max_dom_content_loaded_ms: u64,
    pub max_load_complete_ms: u64,
    pub max_dom_elements: u64,
    pub max_total_load_ms: u64,
}

impl Default for PerformanceCheck {
    fn default() -> Self {
        Self {
            max_dom_content_loaded_ms: 3_000,
            max_load_complete_ms: 5_000,
            max_dom_elements: 1_500,
            max_total_load_ms: 10_000,
        }
    }
}

impl RuleCheck for PerformanceCheck {
    fn requirement_id(&self) -> &str {
        "FR6"
    }

    fn name(&self) -> &str {
        "Load Performance"
    }

    fn description(&self) -> &str {
        "Page becomes usable quickly and keeps a manageable DOM"
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> CheckOutcome {
        let t = ctx.page.timing_metrics();
        let mut s = Subchecks::new();

        s.check(
            t.dom_content_loaded <= self.max_dom_content_loaded_ms,
            format!("DOMContentLoaded after {}ms", t.dom_content_loaded),
            format!(
                "DOMContentLoaded took {}ms (budget {}ms)",
                t.dom_content_loaded, self.max_dom_content_loaded_ms
            ),
        );
        s.check(
            t.load_complete <= self.max_load_complete_ms,
            format!("Load complete after {}ms", t.load_complete),
            format!(
                "Load complete took {}ms (budget {}ms)",
                t.load_complete, self.max_load_complete_ms
            ),
        );
        s.check(
            t.dom_element_count <= self.max_dom_elements,
            format!("{} DOM elements", t.dom_element_count),
            format!(
                "{} DOM elements exceeds {}; large DOMs slow agent parsing",
                t.dom_element_count, self.max_dom_elements
            ),
        );
        s.check(
            t.total_load_time <= self.max_total_load_ms,
            format!("Total load time {}ms", t.total_load_time),
            format!(
                "Total load time {}ms (budget {}ms)",
                t.total_load_time, self.max_total_load_ms
            ),
        );

        s.finish()
    }
}
