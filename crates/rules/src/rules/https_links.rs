//! Plain-HTTP links that could use HTTPS.

use super::seconds;
use crate::error::{ErrorKind, Result};
use crate::host::{Element, Report, Rule};
use crate::links;
use async_trait::async_trait;
use exn::ResultExt;
use tracing::instrument;
use weblint_cache::{Expiry, Outcome, ResultCache};
use weblint_config::HttpsLinksOptions;
use weblint_probe::{ProbeOptions, ProberHandle};

pub struct HttpsLinks {
    options: HttpsLinksOptions,
    cache: ResultCache,
    prober: ProberHandle,
}

impl HttpsLinks {
    pub const NAME: &'static str = "https-links";

    #[instrument(skip_all, fields(path = %options.cache_path.display()))]
    pub async fn new(options: HttpsLinksOptions, prober: ProberHandle) -> Result<Self> {
        let expiry = Expiry::from_secs(options.cache_expiry_found_seconds, options.cache_expiry_not_found_seconds);
        let cache = ResultCache::open(&options.cache_path, expiry).await.or_raise(|| ErrorKind::Cache)?;
        Ok(Self::with_cache(options, cache, prober))
    }

    pub fn with_cache(options: HttpsLinksOptions, cache: ResultCache, prober: ProberHandle) -> Self {
        Self { options, cache, prober }
    }

    fn target(element: &Element) -> Option<&str> {
        match element.tag() {
            "a" | "link" => element.attr("href"),
            "script" | "img" => element.attr("src"),
            _ => None,
        }
    }

    /// Whether the `https:` form of `url` responds; keyed by the original URL.
    async fn found(&self, url: &str) -> bool {
        match self.cache.get(url).await {
            Ok(Some(record)) => match record.outcome {
                Outcome::Https { found } => {
                    tracing::trace!(url, found, "HTTPS availability served from cache");
                    return found;
                },
                other => tracing::warn!(url, outcome = ?other, "Ignoring foreign record in HTTPS cache"),
            },
            Ok(None) => {},
            Err(error) => tracing::warn!(url, error = ?error, "HTTPS cache lookup failed"),
        }
        let upgraded = format!("https:{}", &url["http:".len()..]);
        let options = ProbeOptions::default()
            .with_timeout(seconds(self.options.timeout_seconds))
            .with_user_agent(&self.options.user_agent)
            .head_only()
            .fail_on_non_success();
        tracing::debug!(url, upgraded = upgraded.as_str(), "Probing HTTPS equivalent");
        let found = match self.prober.probe(&upgraded, &options).await {
            Ok(_) => true,
            Err(error) => {
                tracing::debug!(url, error = %*error, "HTTPS equivalent not available");
                false
            },
        };
        if let Err(error) = self.cache.put(url, Outcome::Https { found }).await {
            tracing::warn!(url, error = ?error, "Could not store HTTPS availability");
        }
        found
    }
}

#[async_trait(?Send)]
impl Rule for HttpsLinks {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn element_ready(&mut self, element: &Element, report: &mut Report) {
        let Some(url) = Self::target(element) else {
            return;
        };
        if !links::starts_with_ignore_case(url, "http://") {
            return;
        }
        if self.found(url).await {
            report.add(Self::NAME, element, format!("Link {url} can be upgraded to HTTPS"));
        }
    }
}
