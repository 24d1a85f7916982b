//! Queryable snapshot of a rendered page.
//!
//! A `RenderedPage` is parsed once from a `PageSource` and then answers
//! selector queries, text content and timing. The parsed DOM (`scraper::Html`)
//! is `!Send`, so a page is built and consumed synchronously after all
//! navigation for a pipeline has completed.

use crate::error::{AccessError, AccessResult};
use crate::renderer::PageSource;
use crate::types::{ElementDescriptor, TimingMetrics};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::{BTreeMap, HashSet};

/// Elements whose text is never visible to a reader.
const HIDDEN_TEXT_TAGS: &[&str] = &["script", "style", "template", "head"];

/// Form controls and interactive elements that need an accessible name.
const INTERACTIVE_SELECTOR: &str =
    "a[href], button, input, select, textarea, [role=button], [role=link]";

/// Input types that carry no user-facing control.
const NAMELESS_INPUT_TYPES: &[&str] = &["hidden"];

/// An immutable, parsed page snapshot.
pub struct RenderedPage {
    url: String,
    final_url: String,
    html: Html,
    text: String,
    timing: TimingMetrics,
    script_enabled: bool,
    payload_bytes: usize,
}

impl RenderedPage {
    /// Parse a snapshot from a renderer payload.
    ///
    /// If the renderer did not report a DOM element count, it is filled in
    /// from the parsed document.
    pub fn from_source(source: &PageSource) -> Self {
        let html = Html::parse_document(&source.html);
        let text = visible_text(&html, source.script_enabled);
        let mut timing = source.timing;
        if timing.dom_element_count == 0 {
            timing.dom_element_count = html
                .root_element()
                .descendants()
                .filter(|n| n.value().is_element())
                .count() as u64;
        }
        Self {
            url: source.requested_url.clone(),
            final_url: source.final_url.clone(),
            html,
            text,
            timing,
            script_enabled: source.script_enabled,
            payload_bytes: source.html.len(),
        }
    }

    /// Parse raw markup directly, with zeroed timing.
    pub fn from_html(url: &str, markup: &str, script_enabled: bool) -> Self {
        Self::from_source(&PageSource {
            requested_url: url.to_string(),
            final_url: url.to_string(),
            status: 200,
            html: markup.to_string(),
            script_enabled,
            timing: TimingMetrics::default(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn final_url(&self) -> &str {
        &self.final_url
    }

    pub fn script_enabled(&self) -> bool {
        self.script_enabled
    }

    /// Size of the raw markup in bytes.
    pub fn payload_bytes(&self) -> usize {
        self.payload_bytes
    }

    /// Visible text, whitespace-collapsed.
    pub fn text_content(&self) -> &str {
        &self.text
    }

    /// Number of characters of visible text.
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn timing_metrics(&self) -> TimingMetrics {
        self.timing
    }

    /// All elements matching a CSS selector, in document order.
    pub fn query_selector_all(&self, selector: &str) -> AccessResult<Vec<ElementDescriptor>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).map(describe).collect())
    }

    /// Number of elements matching a selector; an invalid selector counts zero.
    pub fn count(&self, selector: &str) -> usize {
        match parse_selector(selector) {
            Ok(sel) => self.html.select(&sel).count(),
            Err(e) => {
                tracing::debug!("{e}");
                0
            }
        }
    }

    /// Whether any element matches a selector.
    pub fn exists(&self, selector: &str) -> bool {
        self.count(selector) > 0
    }

    /// Interactive elements with no accessible name.
    ///
    /// A control is named by its text, `aria-label`, `aria-labelledby`,
    /// `title`, an `alt` on a contained image, a `<label for>` pointing at its
    /// id, an enclosing `<label>`, or (for inputs) a `value` on button-like
    /// types or a `placeholder`.
    pub fn unlabeled_controls(&self) -> Vec<ElementDescriptor> {
        let Ok(sel) = parse_selector(INTERACTIVE_SELECTOR) else {
            return Vec::new();
        };
        let label_targets: HashSet<String> = parse_selector("label[for]")
            .map(|s| {
                self.html
                    .select(&s)
                    .filter_map(|l| l.value().attr("for"))
                    .map(|v| v.trim().to_string())
                    .collect()
            })
            .unwrap_or_default();

        self.html
            .select(&sel)
            .filter(|el| !has_accessible_name(el, &label_targets))
            .map(describe)
            .collect()
    }
}

fn parse_selector(selector: &str) -> AccessResult<Selector> {
    Selector::parse(selector).map_err(|e| AccessError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{e:?}"),
    })
}

fn describe(el: ElementRef<'_>) -> ElementDescriptor {
    let v = el.value();
    ElementDescriptor {
        tag: v.name().to_string(),
        text: collapse_whitespace(&el.text().collect::<String>()),
        href: v.attr("href").map(String::from),
        attributes: v
            .attrs()
            .map(|(k, val)| (k.to_string(), val.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

fn has_accessible_name(el: &ElementRef<'_>, label_targets: &HashSet<String>) -> bool {
    let v = el.value();
    let attr_set = |name: &str| v.attr(name).is_some_and(|a| !a.trim().is_empty());

    if v.name() == "input"
        && v
            .attr("type")
            .is_some_and(|t| NAMELESS_INPUT_TYPES.contains(&t.to_ascii_lowercase().as_str()))
    {
        return true;
    }
    if attr_set("aria-label") || attr_set("aria-labelledby") || attr_set("title") {
        return true;
    }
    if v.attr("id").is_some_and(|id| label_targets.contains(id.trim())) {
        return true;
    }
    if el
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == "label")
    {
        return true;
    }

    match v.name() {
        "input" => {
            let kind = v.attr("type").unwrap_or("text").to_ascii_lowercase();
            let button_like = matches!(kind.as_str(), "submit" | "reset" | "button" | "image");
            (button_like && (attr_set("value") || attr_set("alt")))
                || matches!(kind.as_str(), "submit" | "reset")
                || attr_set("placeholder")
        }
        "select" | "textarea" => attr_set("placeholder"),
        _ => {
            let text = el.text().collect::<String>();
            if !text.trim().is_empty() {
                return true;
            }
            el.descendants().filter_map(ElementRef::wrap).any(|d| {
                d.value().name() == "img"
                    && d.value().attr("alt").is_some_and(|a| !a.trim().is_empty())
            })
        }
    }
}

/// Collect visible text in document order.
///
/// `<noscript>` content is visible only to a client that did not run script.
fn visible_text(html: &Html, script_enabled: bool) -> String {
    let root = parse_selector("body")
        .ok()
        .and_then(|s| html.select(&s).next())
        .unwrap_or_else(|| html.root_element());

    let mut out = String::new();
    for node in root.descendants() {
        if let Node::Text(t) = node.value() {
            let hidden = node.ancestors().any(|a| match a.value() {
                Node::Element(e) => {
                    HIDDEN_TEXT_TAGS.contains(&e.name())
                        || (script_enabled && e.name() == "noscript")
                }
                _ => false,
            });
            if !hidden {
                out.push_str(t);
                out.push(' ');
            }
        }
    }
    collapse_whitespace(&out)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
