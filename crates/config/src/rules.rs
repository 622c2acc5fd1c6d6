//! Per-rule option sections.
//!
//! Every section deserializes with `#[serde(default)]`, so a user only writes
//! the keys they want to change and everything else keeps its documented
//! default. Unknown keys are rejected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const DEFAULT_USER_AGENT: &str = concat!("weblint/", env!("CARGO_PKG_VERSION"));

const DAY: u64 = 24 * 60 * 60;

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Outbound link liveness (`external-links`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExternalLinksOptions {
    pub enabled: bool,
    pub cache_path: PathBuf,
    /// Retention of live (2xx) results.
    pub cache_expiry_found_seconds: u64,
    /// Retention of redirects, broken statuses and unreachable hosts.
    pub cache_expiry_not_found_seconds: u64,
    pub timeout_seconds: u64,
    pub user_agent: String,
    /// URLs matching any of these are never checked (nor cached).
    pub skip_regexes: Vec<String>,
    /// Route requests through `<proxy_url>?url=<original>`.
    pub proxy_url: Option<String>,
    /// URL → unix timestamp of the last manual review.
    pub manually_reviewed: BTreeMap<String, i64>,
    pub manual_review_expiry_seconds: u64,
}
impl Default for ExternalLinksOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_path: PathBuf::from("cache/external-links.db"),
            cache_expiry_found_seconds: 30 * DAY,
            cache_expiry_not_found_seconds: 3 * DAY,
            timeout_seconds: 5,
            user_agent: default_user_agent(),
            skip_regexes: Vec::new(),
            proxy_url: None,
            manually_reviewed: BTreeMap::new(),
            manual_review_expiry_seconds: 180 * DAY,
        }
    }
}

/// Plain-HTTP links whose HTTPS equivalent works (`https-links`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpsLinksOptions {
    pub enabled: bool,
    pub cache_path: PathBuf,
    pub cache_expiry_found_seconds: u64,
    pub cache_expiry_not_found_seconds: u64,
    pub timeout_seconds: u64,
    pub user_agent: String,
}
impl Default for HttpsLinksOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_path: PathBuf::from("cache/https-availability.db"),
            cache_expiry_found_seconds: 30 * DAY,
            cache_expiry_not_found_seconds: 7 * DAY,
            timeout_seconds: 5,
            user_agent: default_user_agent(),
        }
    }
}

/// CDN package freshness and subresource integrity (`latest-packages`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LatestPackagesOptions {
    pub enabled: bool,
    pub cache_path: PathBuf,
    pub cache_expiry_current_seconds: u64,
    pub cache_expiry_outdated_seconds: u64,
    pub timeout_seconds: u64,
    pub user_agent: String,
    /// URLs containing any of these substrings skip the version check.
    pub skip: Vec<String>,
    /// Package metadata endpoint; `{package}` is replaced by the package name.
    pub registry_url: String,
}
impl Default for LatestPackagesOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_path: PathBuf::from("cache/latest-packages.db"),
            cache_expiry_current_seconds: 7 * DAY,
            cache_expiry_outdated_seconds: DAY,
            timeout_seconds: 5,
            user_agent: default_user_agent(),
            skip: Vec::new(),
            registry_url: "https://data.jsdelivr.com/v1/packages/npm/{package}".to_string(),
        }
    }
}

/// Relative and root-relative links resolved on disk (`internal-links`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InternalLinksOptions {
    pub enabled: bool,
    /// Directory that root-relative (`/…`) links resolve against.
    pub web_root: PathBuf,
    /// Tried in order when the link has no direct file match.
    pub alternative_extensions: Vec<String>,
    pub index_file: String,
    pub check_fragments: bool,
}
impl Default for InternalLinksOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            web_root: PathBuf::from("."),
            alternative_extensions: vec![".html".to_string()],
            index_file: "index.html".to_string(),
            check_fragments: true,
        }
    }
}

/// `hreflang` qualification, self-link and reciprocity (`alternate-language`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlternateLanguageOptions {
    pub enabled: bool,
    pub timeout_seconds: u64,
    pub max_redirects: u32,
    pub user_agent: String,
}
impl Default for AlternateLanguageOptions {
    fn default() -> Self {
        Self { enabled: true, timeout_seconds: 10, max_redirects: 3, user_agent: default_user_agent() }
    }
}

/// Canonical link hygiene (`canonical`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanonicalOptions {
    pub enabled: bool,
}
impl Default for CanonicalOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}
