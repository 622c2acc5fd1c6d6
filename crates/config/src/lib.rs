//! Configuration loading and validation for weblint.
//!
//! Configuration is layered with [`figment`], lowest priority first:
//!
//! 1. compiled defaults ([`Config::default`]),
//! 2. the user's config file in the platform config directory
//!    (e.g. `~/.config/weblint/config.toml`),
//! 3. the project file: either the path given explicitly, or
//!    `./weblint.toml` if it exists,
//! 4. environment variables: `WEBLINT_<SECTION>__<KEY>`, for example
//!    `WEBLINT_EXTERNAL_LINKS__TIMEOUT_SECONDS=10`.
//!
//! The resolved [`Config`] is immutable; each rule reads its own section
//! once, at construction.

pub mod error;
mod rules;

use crate::error::{ErrorKind, Result};
pub use crate::rules::{
    AlternateLanguageOptions, CanonicalOptions, DEFAULT_USER_AGENT, ExternalLinksOptions, HttpsLinksOptions,
    InternalLinksOptions, LatestPackagesOptions,
};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;

const PROJECT_FILE: &str = "weblint.toml";
const ENV_PREFIX: &str = "WEBLINT_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub external_links: ExternalLinksOptions,
    pub https_links: HttpsLinksOptions,
    pub latest_packages: LatestPackagesOptions,
    pub internal_links: InternalLinksOptions,
    pub alternate_language: AlternateLanguageOptions,
    pub canonical: CanonicalOptions,
}

impl Config {
    /// Load the fully layered configuration.
    ///
    /// An explicitly given `path` must exist; the implicit files are optional.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(user) = Self::user_config_path()
            && user.is_file()
        {
            tracing::debug!(path = %user.display(), "Merging user configuration");
            figment = Self::merge_file(figment, &user);
        }
        match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => figment = Self::merge_file(figment, path),
            None if Path::new(PROJECT_FILE).is_file() => figment = Self::merge_file(figment, Path::new(PROJECT_FILE)),
            None => {},
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(figment)
    }

    /// Load only the defaults overlaid with one file; no user file, no environment.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        Self::extract(Self::merge_file(Figment::from(Serialized::defaults(Config::default())), path))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().map_err(|e| ErrorKind::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn merge_file(figment: Figment, path: &Path) -> Figment {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => figment.merge(Toml::file(path)),
        }
    }

    fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "weblint").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Checks that serde can't express. Regex validity is deliberately not
    /// checked here: a bad pattern is dropped with a warning by the rule.
    fn validate(&self) -> Result<()> {
        let timeouts = [
            ("external_links.timeout_seconds", self.external_links.timeout_seconds),
            ("https_links.timeout_seconds", self.https_links.timeout_seconds),
            ("latest_packages.timeout_seconds", self.latest_packages.timeout_seconds),
            ("alternate_language.timeout_seconds", self.alternate_language.timeout_seconds),
        ];
        for (key, value) in timeouts {
            if value == 0 {
                exn::bail!(ErrorKind::Invalid(format!("{key} must be greater than zero")));
            }
        }
        if !self.latest_packages.registry_url.contains("{package}") {
            exn::bail!(ErrorKind::Invalid("latest_packages.registry_url must contain `{package}`".to_string()));
        }
        if self.internal_links.index_file.is_empty() || self.internal_links.index_file.contains('/') {
            exn::bail!(ErrorKind::Invalid("internal_links.index_file must be a plain file name".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    fn write_config(name: &str, contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::File::create(&path).unwrap().write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.external_links.cache_path, PathBuf::from("cache/external-links.db"));
        assert_eq!(config.https_links.cache_path, PathBuf::from("cache/https-availability.db"));
        assert_eq!(config.latest_packages.cache_path, PathBuf::from("cache/latest-packages.db"));
        assert!(config.external_links.cache_expiry_found_seconds > config.external_links.cache_expiry_not_found_seconds);
        assert!(config.https_links.cache_expiry_found_seconds > config.https_links.cache_expiry_not_found_seconds);
        assert!(
            config.latest_packages.cache_expiry_current_seconds > config.latest_packages.cache_expiry_outdated_seconds
        );
        assert_eq!(config.internal_links.alternative_extensions, vec![".html".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_overlays_defaults() {
        let (_dir, path) = write_config(
            "weblint.toml",
            r#"
                [external_links]
                timeout_seconds = 12
                skip_regexes = ["^https://localhost"]

                [external_links.manually_reviewed]
                "https://example.com/flaky" = 1700000000

                [internal_links]
                web_root = "public"
                alternative_extensions = [".html", ".htm"]
            "#,
        );
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.external_links.timeout_seconds, 12);
        assert_eq!(config.external_links.skip_regexes, vec!["^https://localhost".to_string()]);
        assert_eq!(config.external_links.manually_reviewed.get("https://example.com/flaky"), Some(&1_700_000_000));
        // Untouched keys in a touched section keep their defaults.
        assert_eq!(config.external_links.cache_path, PathBuf::from("cache/external-links.db"));
        assert_eq!(config.internal_links.web_root, PathBuf::from("public"));
        assert_eq!(config.internal_links.index_file, "index.html");
        // Untouched sections keep their defaults.
        assert_eq!(config.latest_packages, LatestPackagesOptions::default());
    }

    #[test]
    fn test_json_and_yaml_are_supported() {
        let (_dir, json) = write_config("weblint.json", r#"{"canonical": {"enabled": false}}"#);
        assert!(!Config::from_file(&json).unwrap().canonical.enabled);
        let (_dir, yaml) = write_config("weblint.yaml", "https_links:\n  enabled: false\n");
        assert!(!Config::from_file(&yaml).unwrap().https_links.enabled);
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let (_dir, path) = write_config("weblint.toml", "[external_links]\ntimeout = 3\n");
        let error = Config::from_file(&path).unwrap_err();
        assert!(matches!(*error, ErrorKind::Load(_)));
    }

    #[test]
    fn test_missing_explicit_file() {
        let error = Config::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(*error, ErrorKind::NotFound(_)));
    }

    #[rstest]
    #[case("[external_links]\ntimeout_seconds = 0\n")]
    #[case("[latest_packages]\nregistry_url = \"https://registry.example/\"\n")]
    #[case("[internal_links]\nindex_file = \"\"\n")]
    fn test_invalid_values(#[case] contents: &str) {
        let (_dir, path) = write_config("weblint.toml", contents);
        let error = Config::from_file(&path).unwrap_err();
        assert!(matches!(*error, ErrorKind::Invalid(_)));
    }
}
