use clap::Parser;
use std::path::PathBuf;

/// Check links, CDN packages and alternate-language annotations in static HTML.
#[derive(Parser, Debug)]
#[command(name = "weblint", version, about)]
pub struct Cli {
    /// HTML files or directories to check (directories are searched recursively).
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Configuration file (TOML, YAML or JSON); defaults to ./weblint.toml if present.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Skip every rule that needs the network.
    #[arg(long)]
    pub offline: bool,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
