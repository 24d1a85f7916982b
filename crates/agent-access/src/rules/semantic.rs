//! FR2: Semantic structure an agent can parse without visual cues.

use super::{CheckContext, CheckOutcome, RuleCheck};

/// Fixed sub-score split for FR2. Changing it changes pass/fail outcomes for
/// existing pages, so it is kept as named configuration.
pub mod weights {
    pub const SEMANTIC_HINT: u8 = 40;
    pub const ALT_TEXT: u8 = 30;
    pub const LABELED_CONTROLS: u8 = 30;
}

const SEMANTIC_ELEMENTS: &str = "header, nav, main, footer, article, section, aside, [role]";
const IMAGES_WITHOUT_ALT: &str = "img:not([alt])";

/// How many offending elements to name in an issue.
const MAX_EXAMPLES: usize = 3;

pub struct SemanticStructureCheck;

impl RuleCheck for SemanticStructureCheck {
    fn requirement_id(&self) -> &str {
        "FR2"
    }

    fn name(&self) -> &str {
        "Semantic Structure"
    }

    fn description(&self) -> &str {
        "Landmarks or ARIA roles, text alternatives for images, and named interactive controls"
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> CheckOutcome {
        let page = ctx.page;
        let mut out = CheckOutcome::default();
        let mut score = 0u8;

        let semantic = page.count(SEMANTIC_ELEMENTS);
        if semantic > 0 {
            score += weights::SEMANTIC_HINT;
            out.details
                .push(format!("{semantic} semantic element(s) or ARIA role(s)"));
        } else {
            out.issues.push(
                "No semantic HTML5 elements or ARIA roles; page structure is opaque to agents"
                    .to_string(),
            );
        }

        let missing_alt = page.query_selector_all(IMAGES_WITHOUT_ALT).unwrap_or_default();
        if missing_alt.is_empty() {
            score += weights::ALT_TEXT;
            out.details
                .push(format!("All {} image(s) have alt text", page.count("img")));
        } else {
            let examples: Vec<&str> = missing_alt
                .iter()
                .filter_map(|img| img.attr("src"))
                .take(MAX_EXAMPLES)
                .collect();
            out.issues.push(format!(
                "{} image(s) missing alt attribute (e.g. {})",
                missing_alt.len(),
                if examples.is_empty() {
                    "inline images".to_string()
                } else {
                    examples.join(", ")
                }
            ));
        }

        let unlabeled = page.unlabeled_controls();
        if unlabeled.is_empty() {
            score += weights::LABELED_CONTROLS;
            out.details
                .push("All interactive elements have an accessible name".to_string());
        } else {
            let examples: Vec<String> = unlabeled
                .iter()
                .take(MAX_EXAMPLES)
                .map(|el| match el.attr("name").or(el.attr("id")) {
                    Some(n) => format!("<{} {n}>", el.tag),
                    None => format!("<{}>", el.tag),
                })
                .collect();
            out.issues.push(format!(
                "{} interactive element(s) without an accessible name: {}",
                unlabeled.len(),
                examples.join(", ")
            ));
        }

        out.score = score;
        out
    }
}
