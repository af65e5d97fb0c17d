//! hn - one-shot change notification run
//!
//! Meant to be started by a scheduler; any error exits non-zero.

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::info;

use hgnotify::cli::Cli;
use hgnotify::config::Config;
use hgnotify::runner::Runner;

fn parse_level(level: Option<&str>) -> tracing::Level {
    match level.map(|s| s.to_uppercase()).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some("INFO") | None => tracing::Level::INFO,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(level: Option<&str>) -> Result<()> {
    let level = parse_level(level);

    // stdout so the scheduler's log picks it up
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let runner = Runner::from_config(config).context("Failed to set up clients")?;

    let summary = runner.run(cli.dry_run).await.context("Run failed")?;

    info!(
        changed = summary.changes.len(),
        notifications = summary.notifications.len(),
        posted = summary.posted.len(),
        "Done"
    );

    if summary.changes.is_empty() {
        println!("{} No changes", "✓".green());
    } else {
        for issue in &summary.posted {
            let url = issue.html_url.as_deref().unwrap_or("(no url returned)");
            println!("{} Opened issue: {}", "✓".green(), url.cyan());
        }
        if cli.dry_run {
            println!("{} {} file(s) changed, dry run", "✓".green(), summary.changes.len());
        }
    }

    Ok(())
}
