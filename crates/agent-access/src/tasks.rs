//! Task probes: selector and text-pattern extraction simulating an agent
//! looking for a specific kind of information.
//!
//! A task never fails as a whole: each selector is tried on its own, and a
//! selector the page cannot evaluate is recorded as an issue while the rest
//! continue.

use crate::error::{AccessError, AccessResult};
use crate::page::RenderedPage;
use crate::types::{ContactBreakdown, PatternHit, SelectorHit, TaskResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Matched elements kept per selector.
pub const MAX_ELEMENT_SAMPLES: usize = 5;
/// Text matches kept per pattern.
pub const MAX_TEXT_MATCHES: usize = 10;

pub const EMAIL_PATTERN: &str = r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}";
pub const PHONE_PATTERN: &str = r"\+?\(?\d{1,4}\)?[\s.-]?\d{2,4}[\s.-]?\d{3,4}[\s.-]?\d{3,4}";
pub const ADDRESS_PATTERN: &str = r"\d{1,5}\s+(?:[A-Z][A-Za-z]+\s+){1,4}(?:Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd|Lane|Ln|Drive|Dr|Way|Court|Ct)\b";
pub const PRICE_PATTERN: &str = r"[$€£]\s?\d+(?:[.,]\d{2})?";

/// Post-processing applied to a task's raw result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Generic,
    Contact,
}

/// A static probe definition.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub description: String,
    pub selectors: Vec<String>,
    pub text_patterns: Vec<Regex>,
    pub kind: TaskKind,
}

impl Task {
    /// Build a task, compiling its text patterns. Repeated selectors are
    /// kept once, in first-seen order.
    pub fn new(
        name: &str,
        description: &str,
        selectors: &[&str],
        patterns: &[&str],
    ) -> AccessResult<Self> {
        let text_patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    AccessError::InvalidConfig(format!("task {name}: bad pattern `{p}`: {e}"))
                })
            })
            .collect::<AccessResult<Vec<_>>>()?;
        let mut unique: Vec<String> = Vec::with_capacity(selectors.len());
        for selector in selectors {
            if !unique.iter().any(|s| s == selector) {
                unique.push(selector.to_string());
            }
        }
        Ok(Self {
            name: name.to_string(),
            description: description.to_string(),
            selectors: unique,
            text_patterns,
            kind: TaskKind::Generic,
        })
    }

    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    /// Run every selector and pattern against the page.
    pub fn execute(&self, page: &RenderedPage) -> TaskResult {
        let mut result = TaskResult {
            task_name: self.name.clone(),
            success: false,
            elements_found: Vec::new(),
            text_matches: Vec::new(),
            samples: BTreeMap::new(),
            details: Vec::new(),
            issues: Vec::new(),
            contact: None,
        };

        for selector in &self.selectors {
            let attempt = catch_unwind(AssertUnwindSafe(|| page.query_selector_all(selector)));
            match attempt {
                Ok(Ok(elements)) if !elements.is_empty() => {
                    result.details.push(format!(
                        "selector `{selector}`: {} match(es)",
                        elements.len()
                    ));
                    result.elements_found.push(SelectorHit {
                        selector: selector.clone(),
                        count: elements.len(),
                    });
                    result.samples.insert(
                        selector.clone(),
                        elements.into_iter().take(MAX_ELEMENT_SAMPLES).collect(),
                    );
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => result.issues.push(e.to_string()),
                Err(_) => result
                    .issues
                    .push(format!("Selector `{selector}` could not be evaluated")),
            }
        }

        let text = page.text_content();
        for pattern in &self.text_patterns {
            let matches: Vec<String> = pattern
                .find_iter(text)
                .take(MAX_TEXT_MATCHES)
                .map(|m| m.as_str().trim().to_string())
                .collect();
            if !matches.is_empty() {
                result.details.push(format!(
                    "pattern `{}`: {} match(es)",
                    pattern.as_str(),
                    matches.len()
                ));
                result.text_matches.push(PatternHit {
                    pattern: pattern.as_str().to_string(),
                    matches,
                });
            }
        }

        result.success = !result.elements_found.is_empty() || !result.text_matches.is_empty();
        if !result.success {
            result
                .issues
                .push(format!("No matching elements or text found for {}", self.name));
        }

        if self.kind == TaskKind::Contact {
            result.contact = Some(classify_contact(&result));
        }
        result
    }
}

/// Split a contact task's matches into emails, phones and addresses.
pub fn classify_contact(result: &TaskResult) -> ContactBreakdown {
    let mut out = ContactBreakdown::default();

    for element in result.samples.values().flatten() {
        let href = element.href.as_deref().unwrap_or("").trim();
        if let Some(addr) = strip_scheme(href, "mailto:") {
            push_unique(&mut out.emails, addr);
        } else if let Some(num) = strip_scheme(href, "tel:") {
            push_unique(&mut out.phones, num);
        } else if element.tag == "address"
            || element
                .attr("itemtype")
                .is_some_and(|t| t.contains("PostalAddress"))
        {
            push_unique(&mut out.addresses, &element.text);
        }
    }

    for hit in &result.text_matches {
        let bucket = match hit.pattern.as_str() {
            EMAIL_PATTERN => &mut out.emails,
            PHONE_PATTERN => &mut out.phones,
            ADDRESS_PATTERN => &mut out.addresses,
            _ => continue,
        };
        for m in &hit.matches {
            push_unique(bucket, m);
        }
    }
    out
}

fn strip_scheme<'a>(href: &'a str, scheme: &str) -> Option<&'a str> {
    let prefix = href.get(..scheme.len())?;
    if !prefix.eq_ignore_ascii_case(scheme) {
        return None;
    }
    let rest = &href[scheme.len()..];
    Some(rest.split('?').next().unwrap_or(rest))
}

fn push_unique(bucket: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !bucket.iter().any(|v| v == value) {
        bucket.push(value.to_string());
    }
}

/// Read-only set of named tasks.
#[derive(Debug, Clone)]
pub struct TaskCatalog {
    tasks: Vec<Task>,
}

impl TaskCatalog {
    pub fn new(tasks: Vec<Task>) -> AccessResult<Self> {
        for (i, t) in tasks.iter().enumerate() {
            if tasks[..i].iter().any(|o| o.name == t.name) {
                return Err(AccessError::InvalidConfig(format!(
                    "duplicate task name: {}",
                    t.name
                )));
            }
        }
        Ok(Self { tasks })
    }

    /// Built-in probes: contact info, navigation, main content, search, pricing.
    pub fn standard() -> AccessResult<Self> {
        Self::new(vec![
            Task::new(
                "contact_info",
                "Find email, phone or postal contact details",
                &[
                    r#"a[href^="mailto:"]"#,
                    r#"a[href^="tel:"]"#,
                    "address",
                    r#"[itemtype*="PostalAddress"]"#,
                ],
                &[EMAIL_PATTERN, PHONE_PATTERN, ADDRESS_PATTERN],
            )?
            .with_kind(TaskKind::Contact),
            Task::new(
                "navigation_menu",
                "Find the site's primary navigation links",
                &["nav a[href]", "[role=navigation] a[href]", "header a[href]"],
                &[],
            )?,
            Task::new(
                "main_content",
                "Locate the primary content of the page",
                &["main", "[role=main]", "article", "h1"],
                &[],
            )?,
            Task::new(
                "search",
                "Find a search form an agent could submit",
                &[
                    "form[role=search]",
                    "[role=search]",
                    r#"input[type="search"]"#,
                    r#"input[name="q"]"#,
                ],
                &[],
            )?,
            Task::new(
                "pricing",
                "Find product or plan pricing",
                &["[itemprop=price]", ".price", "[data-price]"],
                &[PRICE_PATTERN],
            )?,
        ])
    }

    pub fn get(&self, name: &str) -> AccessResult<&Task> {
        self.tasks
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| AccessError::UnknownTask(name.to_string()))
    }

    /// Clone the named tasks, in the order given.
    pub fn select(&self, names: &[&str]) -> AccessResult<Vec<Task>> {
        names.iter().map(|n| self.get(n).cloned()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
