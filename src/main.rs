mod cli;
mod error;
mod files;
mod logging;

use crate::cli::Cli;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use std::process::ExitCode;
use std::sync::Arc;
use weblint_config::Config;
use weblint_probe::{CurlProber, ProberHandle};
use weblint_rules::{Document, RuleSet};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match run(cli).await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(error) => {
            eprintln!("weblint: {error:?}");
            ExitCode::from(2)
        },
    }
}

/// Lint every document, printing violations; returns how many were found.
async fn run(cli: Cli) -> Result<usize> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let prober: Option<ProberHandle> = if cli.offline {
        None
    } else {
        Some(Arc::new(CurlProber::discover().or_raise(|| ErrorKind::Setup)?))
    };
    let mut linter = RuleSet::from_config(&config, prober).await.or_raise(|| ErrorKind::Setup)?.into_linter();
    let files = files::collect(&cli.paths)?;

    let mut violations = 0;
    for file in &files {
        let source = match std::fs::read_to_string(file) {
            Ok(source) => source,
            Err(error) => {
                tracing::warn!(path = %file.display(), %error, "Skipping unreadable file");
                continue;
            },
        };
        let report = linter.lint(&Document::parse(file, source)).await;
        for violation in report.violations() {
            println!("{violation}");
        }
        violations += report.len();
    }
    tracing::info!(files = files.len(), violations, "Finished");
    Ok(violations)
}
