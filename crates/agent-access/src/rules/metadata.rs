//! FR4: Machine-readable metadata.

use super::{CheckContext, CheckOutcome, RuleCheck, Subchecks};

const JSON_LD: &str = r#"script[type="application/ld+json"]"#;
const MICRODATA: &str = "[itemscope]";
const OPEN_GRAPH: &str = r#"meta[property^="og:"]"#;

pub struct MetadataCheck;

impl RuleCheck for MetadataCheck {
    fn requirement_id(&self) -> &str {
        "FR4"
    }

    fn name(&self) -> &str {
        "Machine-Readable Metadata"
    }

    fn description(&self) -> &str {
        "Title, description, document language and structured data"
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> CheckOutcome {
        let page = ctx.page;
        let mut s = Subchecks::new();

        let title = page
            .query_selector_all("title")
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.text)
            .find(|t| !t.is_empty());
        match &title {
            Some(t) => s.check(true, format!("Title: {t}"), ""),
            None => s.check(false, "", "Missing or empty <title>"),
        };

        let description = page
            .query_selector_all(r#"meta[name="description"]"#)
            .unwrap_or_default()
            .iter()
            .any(|m| m.has_attr_value("content"));
        s.check(
            description,
            "Meta description present",
            "Missing meta description",
        );

        let lang = page
            .query_selector_all("html")
            .unwrap_or_default()
            .first()
            .and_then(|h| h.attr("lang").map(str::trim).map(String::from))
            .filter(|l| !l.is_empty());
        match &lang {
            Some(l) => s.check(true, format!("Document language: {l}"), ""),
            None => s.check(false, "", "Missing lang attribute on <html>"),
        };

        let mut formats = Vec::new();
        if page.exists(JSON_LD) {
            formats.push("JSON-LD");
        }
        if page.exists(MICRODATA) {
            formats.push("microdata");
        }
        if page.exists(OPEN_GRAPH) {
            formats.push("OpenGraph");
        }
        s.check(
            !formats.is_empty(),
            format!("Structured data: {}", formats.join(", ")),
            "No structured data (JSON-LD, microdata or OpenGraph)",
        );

        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::run_on;

    #[test]
    fn test_complete_metadata() {
        let markup = r#"<html lang="en"><head><title>Shop</title>
            <meta name="description" content="Fresh produce">
            <script type="application/ld+json">{"@type":"Organization"}</script>
            </head><body></body></html>"#;
        let out = run_on(&MetadataCheck, markup);
        assert_eq!(out.score, 100);
        assert!(out.details.iter().any(|d| d == "Structured data: JSON-LD"));
    }

    #[test]
    fn test_bare_document() {
        let out = run_on(&MetadataCheck, "<p>hello</p>");
        assert_eq!(out.score, 0);
        assert_eq!(out.issues.len(), 4);
    }

    #[test]
    fn test_open_graph_counts_as_structured() {
        let markup = r#"<html><head><title>T</title><meta property="og:title" content="T"></head></html>"#;
        let out = run_on(&MetadataCheck, markup);
        assert_eq!(out.score, 50);
    }
}
