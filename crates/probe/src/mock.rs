//! In-memory prober for testing.

use crate::Prober;
use crate::error::{ErrorKind, Result};
use crate::response::{ProbeOptions, Response};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

enum Canned {
    Respond(Response),
    Fail(ErrorKind),
}

/// Prober returning canned responses keyed by exact URL.
///
/// Every call is counted, so tests can assert a cache actually prevented a
/// second request. Unknown URLs fail with a connection error. The
/// `fail_on_non_success` option is honoured the same way [`CurlProber`](crate::CurlProber)
/// honours it.
///
/// # Examples
///
/// ```
/// use weblint_probe::{MockProber, ProbeOptions, Prober, Response};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let prober = MockProber::default().with_response("https://example.com/", Response::new(200));
/// let response = prober.probe("https://example.com/", &ProbeOptions::default()).await.unwrap();
/// assert_eq!(response.status, 200);
/// assert_eq!(prober.calls("https://example.com/"), 1);
/// # }
/// ```
#[derive(Default)]
pub struct MockProber {
    canned: HashMap<String, Canned>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MockProber {
    pub fn with_response(mut self, url: impl Into<String>, response: Response) -> Self {
        self.canned.insert(url.into(), Canned::Respond(response));
        self
    }

    pub fn with_failure(mut self, url: impl Into<String>, kind: ErrorKind) -> Self {
        self.canned.insert(url.into(), Canned::Fail(kind));
        self
    }

    /// Number of times `url` was probed.
    pub fn calls(&self, url: &str) -> usize {
        // A poisoned lock means a test already panicked; panicking again is fine.
        self.calls.lock().unwrap().get(url).copied().unwrap_or_default()
    }

    /// Number of probes across all URLs.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Prober for MockProber {
    async fn probe(&self, url: &str, options: &ProbeOptions) -> Result<Response> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        match self.canned.get(url) {
            Some(Canned::Respond(response)) => {
                if options.fail_on_non_success && !response.is_success() {
                    exn::bail!(ErrorKind::HttpStatus(response.status));
                }
                Ok(response.clone())
            },
            Some(Canned::Fail(kind)) => exn::bail!(kind.clone()),
            None => exn::bail!(ErrorKind::Connection),
        }
    }
}
