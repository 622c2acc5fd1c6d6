//! SQLite result cache for network-backed rules.
//!
//! Each rule that talks to the network owns one store file, so repeated runs
//! can skip requests whose answer is already known. The cache is not a source
//! of truth: deleting the file only means the next run probes everything again.
//!
//! # Architecture
//! A store holds one table of **records**, each a key (normally a normalized
//! URL) plus a tagged [`Outcome`] and the second it was written:
//! - **Liveness**: HTTP status and redirect target of an outbound link.
//! - **Https**: whether the `https://` form of a plain-HTTP link responds.
//! - **Package**: whether a CDN URL pins a currently tagged package version.
//!
//! Positive and negative outcomes have separate retention windows, applied
//! once each time the store is opened.

mod db;
pub mod error;
mod models;
mod store;

pub use crate::db::Database;
pub use crate::models::{Outcome, Record};
pub use crate::store::{Expiry, ResultCache};
