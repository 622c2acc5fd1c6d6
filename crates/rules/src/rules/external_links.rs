//! Outbound link liveness.

use super::{compile_patterns, seconds};
use crate::error::{ErrorKind, Result};
use crate::host::{Element, Report, Rule};
use crate::links;
use async_trait::async_trait;
use exn::ResultExt;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use time::UtcDateTime;
use tracing::instrument;
use weblint_cache::{Expiry, Outcome, ResultCache};
use weblint_config::ExternalLinksOptions;
use weblint_probe::{ProbeOptions, ProberHandle, normalize};

/// Status recorded when no response arrived at all.
const UNREACHABLE: u16 = 0;

/// Reports outbound links that redirect, fail, or can't be reached.
pub struct ExternalLinks {
    options: ExternalLinksOptions,
    skip: Vec<Regex>,
    cache: ResultCache,
    prober: ProberHandle,
}

impl ExternalLinks {
    pub const NAME: &'static str = "external-links";

    #[instrument(skip_all, fields(path = %options.cache_path.display()))]
    pub async fn new(options: ExternalLinksOptions, prober: ProberHandle) -> Result<Self> {
        let expiry = Expiry::from_secs(options.cache_expiry_found_seconds, options.cache_expiry_not_found_seconds);
        let cache = ResultCache::open(&options.cache_path, expiry).await.or_raise(|| ErrorKind::Cache)?;
        Ok(Self::with_cache(options, cache, prober))
    }

    pub fn with_cache(options: ExternalLinksOptions, cache: ResultCache, prober: ProberHandle) -> Self {
        let skip = compile_patterns(Self::NAME, &options.skip_regexes);
        Self { options, skip, cache, prober }
    }

    fn target(element: &Element) -> Option<&str> {
        match element.tag() {
            "a" => element.attr("href"),
            "link" if !element.rel_contains("canonical") && !element.rel_contains("alternate") => element.attr("href"),
            "script" | "img" => element.attr("src"),
            _ => None,
        }
    }

    fn is_skipped(&self, url: &str) -> bool {
        if self.skip.iter().any(|regex| regex.is_match(url)) {
            return true;
        }
        let Some(&reviewed) = self.options.manually_reviewed.get(url) else {
            return false;
        };
        let expiry = i64::try_from(self.options.manual_review_expiry_seconds).unwrap_or(i64::MAX);
        reviewed.saturating_add(expiry) > UtcDateTime::now().unix_timestamp()
    }

    /// The cached or freshly probed `(status, redirect_to)` for `url`.
    async fn liveness(&self, url: &str) -> (u16, Option<String>) {
        let key = normalize(url);
        match self.cache.get(&key).await {
            Ok(Some(record)) => match record.outcome {
                Outcome::Liveness { status, redirect_to } => {
                    tracing::trace!(url, status, "Liveness served from cache");
                    return (status, redirect_to);
                },
                other => tracing::warn!(url, outcome = ?other, "Ignoring foreign record in liveness cache"),
            },
            Ok(None) => {},
            Err(error) => tracing::warn!(url, error = ?error, "Liveness cache lookup failed"),
        }
        let (status, redirect_to) = self.probe(url).await;
        let outcome = Outcome::Liveness { status, redirect_to: redirect_to.clone() };
        if let Err(error) = self.cache.put(&key, outcome).await {
            tracing::warn!(url, error = ?error, "Could not store liveness result");
        }
        (status, redirect_to)
    }

    async fn probe(&self, url: &str) -> (u16, Option<String>) {
        let endpoint = match &self.options.proxy_url {
            Some(proxy) => {
                let separator = if proxy.contains('?') { '&' } else { '?' };
                format!("{proxy}{separator}url={}", utf8_percent_encode(url, NON_ALPHANUMERIC))
            },
            None => url.to_string(),
        };
        let options = ProbeOptions::default()
            .with_timeout(seconds(self.options.timeout_seconds))
            .with_user_agent(&self.options.user_agent)
            .head_only();
        tracing::debug!(url, endpoint = endpoint.as_str(), "Probing external link");
        match self.prober.probe(&endpoint, &options).await {
            Ok(response) => {
                let redirect_to = match response.location {
                    Some(location) if (300..400).contains(&response.status) => Some(links::absolutize(url, &location)),
                    _ => None,
                };
                (response.status, redirect_to)
            },
            Err(error) => {
                tracing::warn!(url, error = %*error, "External link probe failed");
                (UNREACHABLE, None)
            },
        }
    }
}

/// The message for a liveness outcome, or `None` if the link is fine.
fn verdict(url: &str, status: u16, redirect_to: Option<&str>) -> Option<String> {
    match (status, redirect_to) {
        (_, Some(target)) => Some(format!("External link {url} redirects to {target}")),
        (UNREACHABLE, None) => Some(format!("External link {url} is unreachable")),
        (200..400, None) => None,
        (status, None) => Some(format!("External link {url} is broken with status {status}")),
    }
}

#[async_trait(?Send)]
impl Rule for ExternalLinks {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn element_ready(&mut self, element: &Element, report: &mut Report) {
        let Some(url) = Self::target(element) else {
            return;
        };
        if !links::is_http(url) {
            return;
        }
        if self.is_skipped(url) {
            tracing::trace!(url = %url, "Skipping external link");
            return;
        }
        let (status, redirect_to) = self.liveness(url).await;
        if let Some(message) = verdict(url, status, redirect_to.as_deref()) {
            report.add(Self::NAME, element, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Document;
    use rstest::rstest;
    use std::path::Path;
    use std::sync::Arc;
    use weblint_probe::MockProber;
    use weblint_probe::Response;
    use weblint_probe::error::ErrorKind as ProbeErrorKind;

    fn anchor(href: &str) -> Element {
        Element::new("a", Arc::from(Path::new("index.html"))).with_attr("href", href)
    }

    async fn rule(options: ExternalLinksOptions, prober: &Arc<MockProber>) -> ExternalLinks {
        let cache = ResultCache::in_memory(Expiry::from_secs(3600, 60)).await.unwrap();
        ExternalLinks::with_cache(options, cache, prober.clone())
    }

    async fn check(rule: &mut ExternalLinks, element: &Element) -> Vec<String> {
        let mut report = Report::default();
        rule.element_ready(element, &mut report).await;
        report.into_violations().into_iter().map(|v| v.message).collect()
    }

    #[rstest]
    #[case(200, 0)]
    #[case(399, 0)]
    #[case(400, 1)]
    #[case(500, 1)]
    #[tokio::test]
    async fn test_status_boundary(#[case] status: u16, #[case] expected: usize) {
        let url = "https://example.com/status";
        let prober = Arc::new(MockProber::default().with_response(url, Response::new(status)));
        let mut rule = rule(ExternalLinksOptions::default(), &prober).await;
        let messages = check(&mut rule, &anchor(url)).await;
        assert_eq!(messages.len(), expected);
        if expected > 0 {
            assert_eq!(messages[0], format!("External link {url} is broken with status {status}"));
        }
    }

    #[tokio::test]
    async fn test_redirect_is_reported_not_broken() {
        let url = "https://example.com/status/301";
        let prober = Arc::new(
            MockProber::default().with_response(url, Response::new(301).with_location("https://example.com/status/200")),
        );
        let mut rule = rule(ExternalLinksOptions::default(), &prober).await;
        let messages = check(&mut rule, &anchor(url)).await;
        assert_eq!(messages, [format!("External link {url} redirects to https://example.com/status/200")]);
    }

    #[tokio::test]
    async fn test_relative_redirect_is_absolutized() {
        let url = "https://example.com/old";
        let prober = Arc::new(MockProber::default().with_response(url, Response::new(302).with_location("/new")));
        let mut rule = rule(ExternalLinksOptions::default(), &prober).await;
        let messages = check(&mut rule, &anchor(url)).await;
        assert_eq!(messages, [format!("External link {url} redirects to https://example.com/new")]);
    }

    #[tokio::test]
    async fn test_cache_idempotence() {
        let url = "https://example.com/gone";
        let prober = Arc::new(MockProber::default().with_response(url, Response::new(404)));
        let mut rule = rule(ExternalLinksOptions::default(), &prober).await;
        let first = check(&mut rule, &anchor(url)).await;
        let second = check(&mut rule, &anchor(url)).await;
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(prober.calls(url), 1);
    }

    #[tokio::test]
    async fn test_cache_key_ignores_host_case() {
        let prober = Arc::new(MockProber::default().with_response("https://Example.COM/Page", Response::new(200)));
        let mut rule = rule(ExternalLinksOptions::default(), &prober).await;
        assert!(check(&mut rule, &anchor("https://Example.COM/Page")).await.is_empty());
        // Served from the entry stored under the normalized key.
        assert!(check(&mut rule, &anchor("https://example.com/Page")).await.is_empty());
        assert_eq!(prober.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_is_reported_and_cached() {
        let url = "https://nowhere.test/";
        let prober = Arc::new(MockProber::default().with_failure(url, ProbeErrorKind::Dns));
        let mut rule = rule(ExternalLinksOptions::default(), &prober).await;
        assert_eq!(check(&mut rule, &anchor(url)).await, [format!("External link {url} is unreachable")]);
        let record = rule.cache.get(url).await.unwrap().unwrap();
        assert_eq!(record.outcome, Outcome::Liveness { status: 0, redirect_to: None });
    }

    #[tokio::test]
    async fn test_skip_regex_is_neither_probed_nor_cached() {
        let url = "https://localhost:8080/admin";
        let prober = Arc::new(MockProber::default());
        let options = ExternalLinksOptions { skip_regexes: vec!["^https://localhost".to_string()], ..Default::default() };
        let mut rule = rule(options, &prober).await;
        assert!(check(&mut rule, &anchor(url)).await.is_empty());
        assert_eq!(prober.total_calls(), 0);
        assert_eq!(rule.cache.get(&normalize(url)).await.unwrap(), None);
    }

    #[rstest]
    #[case(0, true)]
    #[case(-100, false)]
    #[tokio::test]
    async fn test_manual_review_expiry(#[case] reviewed_ago: i64, #[case] skipped: bool) {
        let url = "https://example.com/flaky";
        let prober = Arc::new(MockProber::default().with_response(url, Response::new(503)));
        let reviewed = UtcDateTime::now().unix_timestamp() - 10 + reviewed_ago;
        let options = ExternalLinksOptions {
            manually_reviewed: [(url.to_string(), reviewed)].into(),
            manual_review_expiry_seconds: 60,
            ..Default::default()
        };
        let mut rule = rule(options, &prober).await;
        let messages = check(&mut rule, &anchor(url)).await;
        assert_eq!(messages.is_empty(), skipped);
        assert_eq!(prober.total_calls(), usize::from(!skipped));
    }

    #[tokio::test]
    async fn test_proxy_endpoint_attributed_to_original() {
        let url = "https://example.com/a?b=1";
        let endpoint = "https://proxy.test/check?url=https%3A%2F%2Fexample%2Ecom%2Fa%3Fb%3D1";
        let prober = Arc::new(MockProber::default().with_response(endpoint, Response::new(410)));
        let options = ExternalLinksOptions { proxy_url: Some("https://proxy.test/check".to_string()), ..Default::default() };
        let mut rule = rule(options, &prober).await;
        assert_eq!(check(&mut rule, &anchor(url)).await, [format!("External link {url} is broken with status 410")]);
        assert_eq!(prober.calls(endpoint), 1);
        assert!(rule.cache.get(url).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_applicability() {
        let prober = Arc::new(MockProber::default());
        let mut rule = rule(ExternalLinksOptions::default(), &prober).await;
        let source: Arc<Path> = Arc::from(Path::new("index.html"));
        let ignored = [
            Element::new("a", source.clone()).with_attr("href", "/local"),
            Element::new("a", source.clone()).with_attr("href", "mailto:someone@example.com"),
            Element::new("link", source.clone()).with_attr("rel", "canonical").with_attr("href", "https://x.test/"),
            Element::new("link", source.clone()).with_attr("rel", "alternate").with_attr("href", "https://x.test/"),
            Element::new("iframe", source.clone()).with_attr("src", "https://x.test/"),
        ];
        for element in &ignored {
            assert!(check(&mut rule, element).await.is_empty());
        }
        assert_eq!(prober.total_calls(), 0);

        let img = Element::new("img", source).with_attr("src", "https://x.test/a.png?w=1&h=2");
        assert_eq!(check(&mut rule, &img).await.len(), 1);
        assert_eq!(prober.calls("https://x.test/a.png?w=1&h=2"), 1);
    }

    #[rstest]
    #[case(r#"<img src="https://x.test/a.png?w=1&amp;h=2">"#, "https://x.test/a.png?w=1&h=2")]
    #[case(r#"<a href="https://x.test/?q=&amp;amp;">x</a>"#, "https://x.test/?q=&amp;")]
    #[case(r#"<a href="https://x.test/&amp;lt;b&amp;gt;">x</a>"#, "https://x.test/&lt;b&gt;")]
    #[tokio::test]
    async fn test_parsed_attribute_is_decoded_once(#[case] body: &str, #[case] expected: &str) {
        let prober = Arc::new(MockProber::default().with_response(expected, Response::new(404)));
        let mut rule = rule(ExternalLinksOptions::default(), &prober).await;
        let document = Document::parse("index.html", format!("<!DOCTYPE html><html><body>{body}</body></html>"));
        let mut messages = Vec::new();
        for element in document.elements() {
            messages.extend(check(&mut rule, &element).await);
        }
        assert_eq!(messages, [format!("External link {expected} is broken with status 404")]);
        assert_eq!(prober.calls(expected), 1);
        assert_eq!(prober.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_cached_redirect_is_reported_again() {
        let url = "https://example.com/moved";
        let target = "https://example.com/moved-here";
        let prober = Arc::new(MockProber::default().with_response(url, Response::new(301).with_location(target)));
        let mut rule = rule(ExternalLinksOptions::default(), &prober).await;
        let first = check(&mut rule, &anchor(url)).await;
        let second = check(&mut rule, &anchor(url)).await;
        assert_eq!(first, [format!("External link {url} redirects to {target}")]);
        assert_eq!(first, second);
        assert_eq!(prober.calls(url), 1);
        let record = rule.cache.get(&normalize(url)).await.unwrap().unwrap();
        assert_eq!(record.outcome, Outcome::Liveness { status: 301, redirect_to: Some(target.to_string()) });
    }
}
