//! Canonical link hygiene.

use crate::consts;
use crate::host::{Document, Report, Rule};
use crate::links;
use async_trait::async_trait;

/// At most one canonical link, in `<head>`, pointing at an absolute
/// fragment-free `http(s)` URL.
#[derive(Debug, Default)]
pub struct Canonical;

impl Canonical {
    pub const NAME: &'static str = "canonical";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait(?Send)]
impl Rule for Canonical {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn document_ready(&mut self, document: &Document, report: &mut Report) {
        let links = document.select(&consts::CANONICAL_SELECTOR);
        let in_head: Vec<usize> =
            document.select(&consts::HEAD_CANONICAL_SELECTOR).iter().map(|link| link.index()).collect();

        for (position, link) in links.iter().enumerate() {
            if position > 0 {
                report.add(Self::NAME, link, "Document has more than one canonical link");
            }
            if !in_head.contains(&link.index()) {
                report.add(Self::NAME, link, "Canonical link must be inside <head>");
            }
            let href = link.attr("href").unwrap_or_default().trim();
            if href.is_empty() {
                report.add(Self::NAME, link, "Canonical link has an empty href");
            } else if !links::is_http(href) {
                report.add(Self::NAME, link, format!("Canonical URL {href} is not a fully qualified http(s) URL"));
            } else if href.contains('#') {
                report.add(Self::NAME, link, format!("Canonical URL {href} must not contain a fragment"));
            }
        }
    }
}
