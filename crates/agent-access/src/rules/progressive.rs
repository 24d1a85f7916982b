//! FR3: The page works before scripts run and improves after.
//!
//! Compares the no-script snapshot against the snapshot rendered under the
//! calling profile.

use super::{CheckContext, CheckOutcome, RuleCheck, Subchecks};
use crate::types::ElementDescriptor;

/// Minimum share of rendered text that must already exist without script.
pub const MIN_TEXT_PARITY_PERCENT: usize = 50;

pub struct ProgressiveEnhancementCheck;

fn is_script_link(link: &ElementDescriptor) -> bool {
    link.href
        .as_deref()
        .is_some_and(|h| h.trim().to_ascii_lowercase().starts_with("javascript:"))
}

fn is_real_link(link: &ElementDescriptor) -> bool {
    match link.href.as_deref().map(str::trim) {
        Some(h) => !h.is_empty() && h != "#" && !is_script_link(link),
        None => false,
    }
}

impl RuleCheck for ProgressiveEnhancementCheck {
    fn requirement_id(&self) -> &str {
        "FR3"
    }

    fn name(&self) -> &str {
        "Progressive Enhancement"
    }

    fn description(&self) -> &str {
        "Content, links and forms keep working without script"
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> CheckOutcome {
        let initial = ctx.initial_payload;
        let rendered = ctx.page;
        let mut s = Subchecks::new();

        let rendered_len = rendered.text_len();
        let initial_len = initial.text_len();
        let parity = if rendered_len == 0 {
            100
        } else {
            (initial_len * 100 / rendered_len).min(100)
        };
        s.check(
            parity >= MIN_TEXT_PARITY_PERCENT,
            format!("{parity}% of rendered text available without script"),
            format!(
                "Only {parity}% of rendered text ({initial_len} of {rendered_len} chars) is available without script"
            ),
        );

        let links = initial.query_selector_all("a[href]").unwrap_or_default();
        let real = links.iter().filter(|l| is_real_link(l)).count();
        s.check(
            real > 0,
            format!("{real} followable link(s) without script"),
            "No followable links in the no-script payload",
        );

        let script_links = links.iter().filter(|l| is_script_link(l)).count();
        s.check(
            script_links == 0,
            "No javascript: pseudo-links",
            format!("{script_links} link(s) use javascript: URLs and do nothing without script"),
        );

        let forms = initial.query_selector_all("form").unwrap_or_default();
        let actionless = forms.iter().filter(|f| !f.has_attr_value("action")).count();
        if forms.is_empty() {
            s.check(true, "No forms to degrade", "");
        } else {
            s.check(
                actionless == 0,
                format!("All {} form(s) submit without script", forms.len()),
                format!(
                    "{actionless} of {} form(s) have no action and need script to submit",
                    forms.len()
                ),
            );
        }

        if ctx.profile.script_enabled {
            s.note(format!("Compared against '{}' rendering", ctx.profile.id));
        }

        s.finish()
    }
}
