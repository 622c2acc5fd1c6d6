use crate::Prober;
use crate::error::{ErrorKind, Result};
use crate::response::{ProbeOptions, Response};
use async_trait::async_trait;
use exn::ResultExt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::instrument;

/// Probes URLs by running one `curl` process per request.
///
/// Running the request out-of-process keeps slow or hanging servers from
/// tying up the async runtime the rules are driven from; the only timeout is
/// the one curl enforces itself via `--max-time`.
#[derive(Debug, Clone)]
pub struct CurlProber {
    path: PathBuf,
}
impl CurlProber {
    /// Locate `curl` on `PATH`.
    pub fn discover() -> Result<Self> {
        match which::which("curl") {
            Ok(path) => {
                tracing::debug!(curl = %path.display(), "Discovered curl executable");
                Ok(Self { path })
            },
            Err(_) => exn::bail!(ErrorKind::CurlNotFound),
        }
    }

    /// Use a specific curl binary.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn arguments(url: &str, options: &ProbeOptions) -> Vec<String> {
        let mut args = vec![
            "--silent".to_string(),
            "--show-error".to_string(),
            "--include".to_string(),
            "--max-time".to_string(),
            options.timeout.as_secs_f64().to_string(),
        ];
        if let Some(user_agent) = &options.user_agent {
            args.extend(["--user-agent".to_string(), user_agent.clone()]);
        }
        if options.head_only {
            args.push("--head".to_string());
        }
        if options.max_redirects > 0 {
            args.extend(["--location".to_string(), "--max-redirs".to_string(), options.max_redirects.to_string()]);
        }
        for (name, value) in &options.headers {
            args.extend(["--header".to_string(), format!("{name}: {value}")]);
        }
        // Stop option parsing so a URL starting with a dash can't be read as a flag.
        args.extend(["--".to_string(), url.to_string()]);
        args
    }
}

#[async_trait]
impl Prober for CurlProber {
    #[instrument(skip(self, options), fields(head_only = options.head_only))]
    async fn probe(&self, url: &str, options: &ProbeOptions) -> Result<Response> {
        let output = Command::new(&self.path)
            .args(Self::arguments(url, options))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .or_raise(|| ErrorKind::Spawn)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let kind = ErrorKind::from_exit_code(output.status.code(), &stderr);
            tracing::debug!(error = %kind, "Probe failed in transport");
            exn::bail!(kind);
        }
        let response = Response::parse(&String::from_utf8_lossy(&output.stdout))?;
        tracing::debug!(status = response.status, "Probe completed");
        if options.fail_on_non_success && !response.is_success() {
            exn::bail!(ErrorKind::HttpStatus(response.status));
        }
        Ok(response)
    }
}
