//! Probe options and the parsed shape of a raw HTTP response.

use crate::error::{ErrorKind, Result};
use std::time::Duration;

/// Per-request settings for a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    /// Issue a `HEAD` instead of a `GET`.
    pub head_only: bool,
    /// Zero means redirects are reported, not followed.
    pub max_redirects: u32,
    pub headers: Vec<(String, String)>,
    /// Treat any status outside `[200, 400)` as a failure.
    pub fail_on_non_success: bool,
}
impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            user_agent: None,
            head_only: false,
            max_redirects: 0,
            headers: Vec::new(),
            fail_on_non_success: false,
        }
    }
}
impl ProbeOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn head_only(mut self) -> Self {
        self.head_only = true;
        self
    }

    pub fn follow_redirects(mut self, max: u32) -> Self {
        self.max_redirects = max;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn fail_on_non_success(mut self) -> Self {
        self.fail_on_non_success = true;
        self
    }
}

/// The final response of a probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    /// Value of the `Location` header, verbatim.
    pub location: Option<String>,
    /// Raw header block, status line included.
    pub headers: String,
    pub body: String,
}
impl Response {
    pub fn new(status: u16) -> Self {
        Self { status, ..Default::default() }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Statuses in `[200, 400)` count as success.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }

    /// Parses the output of `curl --include`.
    ///
    /// Headers and body are split on the first blank line. When the remainder
    /// itself begins with another status line (an interim `1xx`, or a redirect
    /// that was followed) the split is repeated, so the last response wins.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut rest = raw;
        loop {
            let (headers, body) = split_head(rest);
            let status = status_code(headers)?;
            if body.starts_with("HTTP/") {
                rest = body;
                continue;
            }
            return Ok(Self {
                status,
                location: header(headers, "location").map(str::to_string),
                headers: headers.to_string(),
                body: body.to_string(),
            });
        }
    }
}

fn split_head(raw: &str) -> (&str, &str) {
    let crlf = raw.find("\r\n\r\n").map(|at| (at, 4));
    let lf = raw.find("\n\n").map(|at| (at, 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };
    match split {
        Some((at, width)) => (&raw[..at], &raw[at + width..]),
        None => (raw.trim_end(), ""),
    }
}

fn status_code(headers: &str) -> Result<u16> {
    let line = headers.lines().next().unwrap_or_default();
    if !line.starts_with("HTTP/") {
        exn::bail!(ErrorKind::MalformedResponse);
    }
    match line.split_whitespace().nth(1).and_then(|code| code.parse::<u16>().ok()) {
        Some(code) => Ok(code),
        None => exn::bail!(ErrorKind::MalformedResponse),
    }
}

fn header<'a>(headers: &'a str, name: &str) -> Option<&'a str> {
    headers.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
    })
}
