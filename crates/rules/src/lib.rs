//! Link, package and alternate-language rules for parsed HTML documents.
//!
//! Each rule subscribes to the host's lifecycle events (see [`host`]) and
//! reports what it finds into a [`Report`]:
//!
//! | Rule                   | Event          | Network | Result store                  |
//! |------------------------|----------------|---------|-------------------------------|
//! | `canonical`            | document ready | no      | none                          |
//! | `internal-links`       | element ready  | no      | in-memory existence/id maps   |
//! | `external-links`       | element ready  | yes     | `cache/external-links.db`     |
//! | `https-links`          | element ready  | yes     | `cache/https-availability.db` |
//! | `latest-packages`      | element ready  | yes     | `cache/latest-packages.db`    |
//! | `alternate-language`   | document ready | yes     | none                          |
//!
//! Network-backed rules consult their store first and only probe on a miss.
//! A failed probe never escapes a rule: it becomes a violation, a cached
//! negative outcome, or a log line, depending on the rule.

mod consts;
pub mod error;
pub mod host;
pub mod links;
mod rules;

pub use crate::host::{Document, Element, Linter, Report, Rule, Violation};
pub use crate::rules::{
    AlternateLanguage, Canonical, ExternalLinks, HttpsLinks, InternalLinks, LatestPackages, Resolver, RuleSet,
};
