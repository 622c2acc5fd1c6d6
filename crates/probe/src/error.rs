//! Probe Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Every transport problem ends up here instead of unwinding into the caller;
//! a rule decides for itself whether a failed probe is a violation, a cache
//! entry, or just a log line.

use derive_more::{Display, Error};

/// A probe error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for probe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("curl not detected on your system")]
    CurlNotFound,
    /// The curl process could not be started at all.
    #[display("failed to spawn curl")]
    Spawn,
    #[display("request timed out")]
    Timeout,
    #[display("could not resolve host")]
    Dns,
    #[display("connection failed")]
    Connection,
    /// Any other non-zero exit of the transport, with whatever it printed.
    #[display("transport error: {_0}")]
    Transport(#[error(not(source))] String),
    /// Only raised when the caller asked for fail-on-non-success semantics.
    #[display("unsuccessful HTTP status: {_0}")]
    HttpStatus(#[error(not(source))] u16),
    #[display("malformed HTTP response")]
    MalformedResponse,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Dns | Self::Connection | Self::Transport(_))
    }

    /// Maps a curl exit code onto an error category.
    pub(crate) fn from_exit_code(code: Option<i32>, stderr: &str) -> Self {
        match code {
            Some(6) => Self::Dns,
            Some(7) => Self::Connection,
            Some(28) => Self::Timeout,
            Some(code) => Self::Transport(format!("curl exited with code {code}: {}", stderr.trim())),
            None => Self::Transport("curl terminated by signal".to_string()),
        }
    }
}
