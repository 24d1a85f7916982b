//! FR5: Links and headings an agent can follow and orient by.

use super::{CheckContext, CheckOutcome, RuleCheck, Subchecks};
use crate::types::ElementDescriptor;

/// Share of links that must carry descriptive text.
pub const MIN_DESCRIPTIVE_PERCENT: usize = 80;

const GENERIC_LINK_TEXT: &[&str] = &[
    "click here",
    "here",
    "read more",
    "more",
    "link",
    "this",
    "learn more",
    "details",
];

pub struct NavigationCheck;

fn is_descriptive(link: &ElementDescriptor) -> bool {
    let name = if !link.text.trim().is_empty() {
        link.text.trim().to_lowercase()
    } else if let Some(label) = link.attr("aria-label").or(link.attr("title")) {
        label.trim().to_lowercase()
    } else {
        return false;
    };
    !name.is_empty() && !GENERIC_LINK_TEXT.contains(&name.as_str())
}

impl RuleCheck for NavigationCheck {
    fn requirement_id(&self) -> &str {
        "FR5"
    }

    fn name(&self) -> &str {
        "Navigation Discoverability"
    }

    fn description(&self) -> &str {
        "Descriptive links, a single top-level heading, and a navigation landmark with links"
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> CheckOutcome {
        let page = ctx.page;
        let mut s = Subchecks::new();

        let links = page.query_selector_all("a[href]").unwrap_or_default();
        s.check(
            !links.is_empty(),
            format!("{} link(s) found", links.len()),
            "No links found; agents cannot discover other pages",
        );

        let descriptive = links.iter().filter(|l| is_descriptive(l)).count();
        let percent = if links.is_empty() {
            100
        } else {
            descriptive * 100 / links.len()
        };
        s.check(
            percent >= MIN_DESCRIPTIVE_PERCENT,
            format!("{percent}% of links have descriptive text"),
            format!(
                "Only {percent}% of links have descriptive text ({} generic or empty)",
                links.len() - descriptive
            ),
        );

        let h1 = page.count("h1");
        s.check(
            h1 == 1,
            "Exactly one <h1>",
            format!("Expected exactly one <h1>, found {h1}"),
        );

        let nav_links = page.count("nav a[href], [role=navigation] a[href]");
        s.check(
            nav_links > 0,
            format!("Navigation landmark contains {nav_links} link(s)"),
            "No links inside a navigation landmark",
        );

        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::run_on;

    #[test]
    fn test_well_structured_navigation() {
        let markup = r#"<nav><a href="/">Home</a><a href="/products">Products</a></nav><h1>Store</h1>"#;
        let out = run_on(&NavigationCheck, markup);
        assert_eq!(out.score, 100);
    }

    #[test]
    fn test_generic_link_text_fails() {
        let markup = r#"<h1>A</h1><h1>B</h1><a href="/1">click here</a><a href="/2">Read more</a><a href="/3">Pricing</a>"#;
        let out = run_on(&NavigationCheck, markup);
        // links present only
        assert_eq!(out.score, 25);
        assert!(out.issues.iter().any(|i| i.contains("33%")));
        assert!(out.issues.iter().any(|i| i.contains("found 2")));
    }

    #[test]
    fn test_aria_label_makes_icon_link_descriptive() {
        let link = ElementDescriptor {
            tag: "a".to_string(),
            text: String::new(),
            href: Some("/cart".to_string()),
            attributes: [("aria-label".to_string(), "Shopping cart".to_string())]
                .into_iter()
                .collect(),
        };
        assert!(is_descriptive(&link));
    }
}
