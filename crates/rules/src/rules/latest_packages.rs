//! CDN package freshness and subresource integrity.

use super::seconds;
use crate::consts;
use crate::error::{ErrorKind, Result};
use crate::host::{Element, Report, Rule};
use async_trait::async_trait;
use exn::ResultExt;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::instrument;
use weblint_cache::{Expiry, Outcome, ResultCache};
use weblint_config::LatestPackagesOptions;
use weblint_probe::{ProbeOptions, ProberHandle};

const INTEGRITY_ATTRIBUTES: [&str; 2] = ["integrity", "crossorigin"];

/// The part of the registry's package metadata this rule reads.
#[derive(Debug, Deserialize)]
struct PackageMetadata {
    /// Tag name → version, e.g. `latest → 5.3.8`.
    #[serde(alias = "dist-tags")]
    tags: BTreeMap<String, String>,
}

impl PackageMetadata {
    /// Any tag counts, not only `latest`.
    fn is_current(&self, version: &str) -> bool {
        self.tags.values().any(|tagged| tagged == version)
    }

    fn latest(&self) -> &str {
        self.tags.get("latest").map_or("unknown", String::as_str)
    }
}

/// A package pinned by a CDN URL.
#[derive(Debug, PartialEq, Eq)]
struct Pinned<'a> {
    name: &'a str,
    version: &'a str,
}

fn pinned(url: &str) -> Option<Pinned<'_>> {
    let captures = consts::CDN_PACKAGE_REGEX.captures(url)?;
    Some(Pinned { name: captures.get(1)?.as_str(), version: captures.get(2)?.as_str() })
}

pub struct LatestPackages {
    options: LatestPackagesOptions,
    cache: ResultCache,
    prober: ProberHandle,
}

impl LatestPackages {
    pub const NAME: &'static str = "latest-packages";

    #[instrument(skip_all, fields(path = %options.cache_path.display()))]
    pub async fn new(options: LatestPackagesOptions, prober: ProberHandle) -> Result<Self> {
        let expiry = Expiry::from_secs(options.cache_expiry_current_seconds, options.cache_expiry_outdated_seconds);
        let cache = ResultCache::open(&options.cache_path, expiry).await.or_raise(|| ErrorKind::Cache)?;
        Ok(Self::with_cache(options, cache, prober))
    }

    pub fn with_cache(options: LatestPackagesOptions, cache: ResultCache, prober: ProberHandle) -> Self {
        Self { options, cache, prober }
    }

    fn target(element: &Element) -> Option<&str> {
        match element.tag() {
            "script" => element.attr("src"),
            "link" if element.rel_contains("stylesheet") => element.attr("href"),
            _ => None,
        }
    }

    #[instrument(skip(self))]
    async fn metadata(&self, name: &str) -> Result<PackageMetadata> {
        let endpoint = self.options.registry_url.replace("{package}", name);
        let options = ProbeOptions::default()
            .with_timeout(seconds(self.options.timeout_seconds))
            .with_user_agent(&self.options.user_agent)
            .with_header("Accept", "application/json")
            .follow_redirects(3)
            .fail_on_non_success();
        let response = self.prober.probe(&endpoint, &options).await.or_raise(|| ErrorKind::Probe)?;
        serde_json::from_str(&response.body).or_raise(|| ErrorKind::Registry)
    }

    async fn check_version(&self, url: &str, package: &Pinned<'_>, element: &Element, report: &mut Report) {
        match self.cache.get(url).await {
            Ok(Some(record)) => match record.outcome {
                Outcome::Package { current } => {
                    tracing::trace!(url, current, "Package freshness served from cache");
                    if !current {
                        report.add(
                            Self::NAME,
                            element,
                            format!("Package {} is outdated, found {}", package.name, package.version),
                        );
                    }
                    return;
                },
                other => tracing::warn!(url, outcome = ?other, "Ignoring foreign record in package cache"),
            },
            Ok(None) => {},
            Err(error) => tracing::warn!(url, error = ?error, "Package cache lookup failed"),
        }

        let metadata = match self.metadata(package.name).await {
            Ok(metadata) => metadata,
            Err(error) => {
                // Transient; try again next run rather than caching the failure.
                tracing::warn!(url, package = package.name, error = %*error, "Could not fetch package metadata");
                return;
            },
        };
        let current = metadata.is_current(package.version);
        if let Err(error) = self.cache.put(url, Outcome::Package { current }).await {
            tracing::warn!(url, error = ?error, "Could not store package freshness");
        }
        if !current {
            report.add(
                Self::NAME,
                element,
                format!(
                    "Package {} is not using a current version tag, found {}, latest is {}",
                    package.name,
                    package.version,
                    metadata.latest()
                ),
            );
        }
    }
}

#[async_trait(?Send)]
impl Rule for LatestPackages {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn element_ready(&mut self, element: &Element, report: &mut Report) {
        let Some(url) = Self::target(element) else {
            return;
        };
        let Some(package) = pinned(url) else {
            return;
        };

        let missing: Vec<&str> = INTEGRITY_ATTRIBUTES.into_iter().filter(|name| !element.has_attr(name)).collect();
        if !missing.is_empty() {
            report.add(Self::NAME, element, format!("CDN resource {url} is missing {}", missing.join(" and ")));
        }

        if self.options.skip.iter().any(|skip| url.contains(skip.as_str())) {
            tracing::trace!(url = %url, "Skipping package freshness");
            return;
        }
        self.check_version(url, &package, element, report).await;
    }
}
