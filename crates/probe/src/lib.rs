//! Outbound HTTP probing for link and package checks.
//!
//! This crate provides the two leaf pieces every network-backed rule shares:
//!
//! - **[`normalize`]**: turns a URL into a stable cache key (scheme and host
//!   lowercased, everything else untouched).
//! - **[`Prober`]**: issues exactly one HTTP request and hands back the final
//!   status, `Location` header and body. Transport problems come back as an
//!   [`Err`](error::Error), never as a panic, so one bad URL can't abort the
//!   validation of the rest of a document.
//!
//! The production implementation, [`CurlProber`], shells out to `curl`.
//! Enable the `mock` feature for [`MockProber`] in other crates' tests.

mod curl;
pub mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod normalize;
mod response;

pub use crate::curl::CurlProber;
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::MockProber;
pub use crate::normalize::normalize;
pub use crate::response::{ProbeOptions, Response};
use async_trait::async_trait;
use std::sync::Arc;

pub type ProberHandle = Arc<dyn Prober>;

/// Issues a single HTTP request on behalf of a rule.
///
/// Redirects are only followed when [`ProbeOptions::max_redirects`] is
/// non-zero; otherwise the caller sees the `3xx` and its `Location`.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str, options: &ProbeOptions) -> error::Result<Response>;
}
