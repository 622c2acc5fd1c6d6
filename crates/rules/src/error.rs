//! Rules Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Only rule construction returns these to the caller. Once a rule is running,
//! failures are logged and turned into either a violation or nothing at all.

use derive_more::{Display, Error};

/// A rule error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for rule operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The rule's result store could not be opened or used.
    #[display("result cache error")]
    Cache,
    /// An outbound request failed.
    #[display("probe error")]
    Probe,
    /// The package registry answered with something that isn't package metadata.
    #[display("unexpected registry response")]
    Registry,
    #[display("invalid option: {_0}")]
    InvalidOption(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Probe)
    }
}
