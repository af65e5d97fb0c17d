//! CLI argument parsing

use clap::Parser;
use std::path::PathBuf;

/// Check tracked hg files for changes and file an issue about them
#[derive(Parser, Debug)]
#[command(name = "hn")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (default: ./config.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Detect and render, but do not post anything
    #[arg(long)]
    pub dry_run: bool,
}
