//! The minimal host a rule runs inside.
//!
//! A [`Document`] is parsed once; the [`Linter`] then hands every element to
//! every rule in document order (the "element ready" event), followed by the
//! whole document (the "document ready" event). Rules never return errors to
//! the linter: everything they find goes into the [`Report`].

use crate::consts;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

/// Owned snapshot of one element and where it came from.
///
/// Attribute values taken from a parsed [`Document`] have had their character
/// references decoded exactly once, by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    /// Position in document order, counting elements only.
    index: usize,
    source: Arc<Path>,
}

impl Element {
    pub fn new(tag: impl Into<String>, source: Arc<Path>) -> Self {
        Self { tag: tag.into(), attributes: Vec::new(), index: 0, source }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    fn from_ref(element: ElementRef<'_>, index: usize, source: Arc<Path>) -> Self {
        let value = element.value();
        Self {
            tag: value.name().to_ascii_lowercase(),
            attributes: value.attrs().map(|(name, value)| (name.to_string(), value.to_string())).collect(),
            index,
            source,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// `true` if the space-separated `rel` attribute contains `token`.
    pub fn rel_contains(&self, token: &str) -> bool {
        self.attr("rel").is_some_and(|rel| rel.split_ascii_whitespace().any(|t| t.eq_ignore_ascii_case(token)))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.tag)?;
        for name in ["id", "href", "src"] {
            if let Some(value) = self.attr(name) {
                return write!(f, " {name}=\"{value}\"");
            }
        }
        Ok(())
    }
}

/// A parsed HTML file, along with its raw text.
pub struct Document {
    path: Arc<Path>,
    source: String,
    html: Html,
}

impl Document {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn parse(path: impl AsRef<Path>, source: impl Into<String>) -> Self {
        let source = source.into();
        let html = Html::parse_document(&source);
        Self { path: Arc::from(path.as_ref()), source, html }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw text exactly as read from disk.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// The document's declared `<html lang>`, or an empty string.
    pub fn language(&self) -> &str {
        self.html.root_element().value().attr("lang").unwrap_or_default()
    }

    fn element_refs(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.html.tree.root().descendants().filter_map(ElementRef::wrap)
    }

    /// Every element, in document order.
    pub fn elements(&self) -> Vec<Element> {
        self.element_refs()
            .enumerate()
            .map(|(index, element)| Element::from_ref(element, index, Arc::clone(&self.path)))
            .collect()
    }

    /// Snapshot of a node obtained from this document's tree.
    pub fn element(&self, element: ElementRef<'_>) -> Element {
        let index = self.element_refs().position(|candidate| candidate == element).unwrap_or_default();
        Element::from_ref(element, index, Arc::clone(&self.path))
    }

    pub fn select(&self, selector: &Selector) -> Vec<Element> {
        self.html.select(selector).map(|element| self.element(element)).collect()
    }

    /// The `<head>` element, which the parser always synthesizes.
    pub fn head(&self) -> Option<Element> {
        self.html.select(&consts::HEAD_SELECTOR).next().map(|head| self.element(head))
    }
}

/// One problem found by one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub rule: &'static str,
    pub element: Element,
    pub message: String,
}

/// `path: <tag> attr="value" (element N) [rule] message`, where `N` is the
/// element's document-order index.
impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (element {}) [{}] {}",
            self.element.source().display(),
            self.element,
            self.element.index(),
            self.rule,
            self.message
        )
    }
}

/// The report sink rules write violations into.
#[derive(Debug, Default)]
pub struct Report {
    violations: Vec<Violation>,
}

impl Report {
    pub fn add(&mut self, rule: &'static str, element: &Element, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(rule, element = %element, message = message.as_str(), "Violation reported");
        self.violations.push(Violation { rule, element: element.clone(), message });
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

/// A check subscribed to document lifecycle events.
///
/// Both handlers are awaited one at a time, in order; a handler that does
/// network I/O holds up the walk until it completes.
#[async_trait(?Send)]
pub trait Rule {
    fn name(&self) -> &'static str;

    async fn element_ready(&mut self, _element: &Element, _report: &mut Report) {}

    async fn document_ready(&mut self, _document: &Document, _report: &mut Report) {}
}

/// Drives a fixed set of rules over documents.
pub struct Linter {
    rules: Vec<Box<dyn Rule>>,
}

impl Linter {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    #[instrument(skip_all, fields(path = %document.path().display()))]
    pub async fn lint(&mut self, document: &Document) -> Report {
        let mut report = Report::default();
        for element in document.elements() {
            for rule in &mut self.rules {
                rule.element_ready(&element, &mut report).await;
            }
        }
        for rule in &mut self.rules {
            rule.document_ready(document, &mut report).await;
        }
        tracing::debug!(violations = report.len(), "Document linted");
        report
    }
}
