//! FR1: Content reachable without executing any script.
//!
//! Always evaluated on the forced no-script snapshot, so the result does not
//! depend on whether the calling profile runs script.

use super::{CheckContext, CheckOutcome, RuleCheck, Subchecks};

/// Minimum visible characters for the payload to count as content.
pub const MIN_TEXT_CHARS: usize = 100;

const HEADINGS: &str = "h1, h2, h3, h4, h5, h6";
const NAV_LANDMARK: &str = "nav, [role=navigation]";
const MAIN_LANDMARK: &str = "main, [role=main]";

pub struct InitialPayloadCheck;

impl RuleCheck for InitialPayloadCheck {
    fn requirement_id(&self) -> &str {
        "FR1"
    }

    fn name(&self) -> &str {
        "Initial Payload Accessibility"
    }

    fn description(&self) -> &str {
        "Core content, headings and landmarks are present in the HTML before any script runs"
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> CheckOutcome {
        let page = ctx.initial_payload;
        let mut s = Subchecks::new();

        let headings = page.count(HEADINGS);
        s.check(
            headings > 0,
            format!("{headings} heading element(s) in the initial payload"),
            "No heading elements in the initial HTML payload",
        );

        s.check(
            page.exists(NAV_LANDMARK),
            "Navigation landmark present without script",
            "No navigation landmark (<nav> or role=navigation) in the initial payload",
        );

        s.check(
            page.exists(MAIN_LANDMARK),
            "Main content landmark present without script",
            "No main content landmark (<main> or role=main) in the initial payload",
        );

        let chars = page.text_len();
        s.check(
            chars >= MIN_TEXT_CHARS,
            format!("{chars} characters of text without script"),
            format!(
                "Only {chars} characters of text without script (minimum {MIN_TEXT_CHARS}); content likely depends on client-side rendering"
            ),
        );

        s.finish()
    }
}
