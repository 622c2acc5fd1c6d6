//! `hreflang` qualification, self-link and reciprocity.
//!
//! Remote alternates are fetched fresh on every run: nothing here is cached.

use super::seconds;
use crate::consts;
use crate::host::{Document, Element, Report, Rule};
use async_trait::async_trait;
use scraper::Html;
use weblint_config::AlternateLanguageOptions;
use weblint_probe::{ProbeOptions, ProberHandle};

pub struct AlternateLanguage {
    options: AlternateLanguageOptions,
    prober: ProberHandle,
}

impl AlternateLanguage {
    pub const NAME: &'static str = "alternate-language";

    pub fn new(options: AlternateLanguageOptions, prober: ProberHandle) -> Self {
        Self { options, prober }
    }

    fn probe_options(&self) -> ProbeOptions {
        ProbeOptions::default()
            .with_timeout(seconds(self.options.timeout_seconds))
            .with_user_agent(&self.options.user_agent)
            .follow_redirects(self.options.max_redirects)
            .fail_on_non_success()
    }

    /// Fetch `href` and look for an alternate pointing back at `canonical`
    /// with `language`.
    async fn check_reciprocal(
        &self,
        alternate: &Element,
        href: &str,
        canonical: &str,
        language: &str,
        report: &mut Report,
    ) {
        let response = match self.prober.probe(href, &self.probe_options()).await {
            Ok(response) => response,
            Err(error) => {
                tracing::debug!(href, error = %*error, "Alternate page fetch failed");
                report.add(Self::NAME, alternate, format!("Alternate page {href} is not accessible"));
                return;
            },
        };
        let remote = Html::parse_document(&response.body);
        let reciprocal = remote.select(&consts::ALTERNATE_SELECTOR).any(|link| {
            let value = link.value();
            value.attr("href").map(str::trim) == Some(canonical)
                && value.attr("hreflang").is_some_and(|lang| lang.trim().eq_ignore_ascii_case(language))
        });
        if !reciprocal {
            report.add(
                Self::NAME,
                alternate,
                format!("Alternate page {href}: reciprocal link not found (hreflang \"{language}\" to {canonical})"),
            );
        }
    }
}

#[async_trait(?Send)]
impl Rule for AlternateLanguage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn document_ready(&mut self, document: &Document, report: &mut Report) {
        let alternates = document.select(&consts::ALTERNATE_SELECTOR);
        if alternates.is_empty() {
            return;
        }
        let canonical = document
            .select(&consts::CANONICAL_SELECTOR)
            .iter()
            .find_map(|link| link.attr("href").map(str::trim).filter(|href| !href.is_empty()).map(str::to_string));
        let Some(canonical) = canonical else {
            tracing::trace!(path = %document.path().display(), "Alternates without canonical; skipping");
            return;
        };
        let language = document.language().trim();

        for alternate in &alternates {
            let href = alternate.attr("href").unwrap_or_default().trim();
            if !href.contains("://") {
                report.add(Self::NAME, alternate, format!("Alternate link {href} is not fully qualified"));
            }
        }

        let self_link =
            alternates.iter().find(|alternate| alternate.attr("href").map(str::trim) == Some(canonical.as_str()));
        match self_link {
            Some(link) => {
                let hreflang = link.attr("hreflang").unwrap_or_default().trim();
                if !hreflang.eq_ignore_ascii_case(language) {
                    let message = format!(
                        "Self-referencing alternate has hreflang \"{hreflang}\" but the page language is \"{language}\""
                    );
                    report.add(Self::NAME, link, message);
                }
            },
            None => {
                let anchor = document.head().unwrap_or_else(|| alternates[0].clone());
                report.add(Self::NAME, &anchor, format!("No alternate link references this page ({canonical})"));
            },
        }

        for alternate in &alternates {
            let href = alternate.attr("href").unwrap_or_default().trim();
            if href == canonical || !href.contains("://") {
                continue;
            }
            self.check_reciprocal(alternate, href, &canonical, language, report).await;
        }
    }
}
