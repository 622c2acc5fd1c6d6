mod alternate_language;
mod canonical;
mod external_links;
mod https_links;
mod internal_links;
mod latest_packages;

pub use self::alternate_language::AlternateLanguage;
pub use self::canonical::Canonical;
pub use self::external_links::ExternalLinks;
pub use self::https_links::HttpsLinks;
pub use self::internal_links::{InternalLinks, Resolver};
pub use self::latest_packages::LatestPackages;
use crate::error::Result;
use crate::host::{Linter, Rule};
use regex::Regex;
use std::time::Duration;
use tracing::instrument;
use weblint_config::Config;
use weblint_probe::ProberHandle;

/// The enabled rules, constructed once per run.
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    /// Construct every enabled rule, opening each rule's result store.
    ///
    /// Without a prober the network-backed rules are left out entirely.
    #[instrument(skip_all, fields(offline = prober.is_none()))]
    pub async fn from_config(config: &Config, prober: Option<ProberHandle>) -> Result<Self> {
        let mut rules: Vec<Box<dyn Rule>> = Vec::new();
        if config.canonical.enabled {
            rules.push(Box::new(Canonical::new()));
        }
        if config.internal_links.enabled {
            rules.push(Box::new(InternalLinks::new(config.internal_links.clone())?));
        }
        match prober {
            Some(prober) => {
                if config.external_links.enabled {
                    rules.push(Box::new(ExternalLinks::new(config.external_links.clone(), prober.clone()).await?));
                }
                if config.https_links.enabled {
                    rules.push(Box::new(HttpsLinks::new(config.https_links.clone(), prober.clone()).await?));
                }
                if config.latest_packages.enabled {
                    rules.push(Box::new(LatestPackages::new(config.latest_packages.clone(), prober.clone()).await?));
                }
                if config.alternate_language.enabled {
                    rules.push(Box::new(AlternateLanguage::new(config.alternate_language.clone(), prober)));
                }
            },
            None => tracing::info!("Offline; network-backed rules disabled"),
        }
        tracing::info!(rules = rules.len(), "Rules constructed");
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn into_linter(self) -> Linter {
        Linter::new(self.rules)
    }
}

/// Compile user-supplied patterns; invalid ones are dropped with a warning.
pub(crate) fn compile_patterns(rule: &'static str, patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(error) => {
                tracing::warn!(rule, pattern = pattern.as_str(), %error, "Dropping invalid pattern");
                None
            },
        })
        .collect()
}

pub(crate) fn seconds(value: u64) -> Duration {
    Duration::from_secs(value)
}
