//! cme-margin: download the CME outright margin feed and fold it into a CSV history.
//!
//! ```text
//! cme-margin /path/to/margins.csv
//! ```
//!
//! If the file exists the snapshot is merged into it (only changed margins are
//! appended); otherwise the snapshot is written as a new file. Without a path
//! the usage line is printed and nothing happens.

use anyhow::{Context, Result};
use clap::Parser;
use margin_core::{update_margin_file, CmeMarginFeed, UpdaterConfig};
use std::path::PathBuf;
use tracing::Level;

const USAGE: &str = "Usage: cme-margin /path/to/file";

#[derive(Parser)]
#[command(
    name = "cme-margin",
    about = "Merge the CME outright margin feed into a CSV history file"
)]
struct Cli {
    /// Margin history CSV to create or update.
    path: Option<PathBuf>,

    /// TOML config file (feed URL, timeout, retries).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the feed URL.
    #[arg(long)]
    url: Option<String>,

    /// Log debug detail.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(path) = cli.path else {
        println!("{USAGE}");
        return Ok(());
    };

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(file) => UpdaterConfig::load(file)
            .with_context(|| format!("failed to load config {}", file.display()))?,
        None => UpdaterConfig::default(),
    };
    if let Some(url) = cli.url {
        config.feed.url = url;
        config.validate()?;
    }

    let feed = CmeMarginFeed::new(&config.feed)?;
    let summary = update_margin_file(&feed, &path)
        .with_context(|| format!("failed to update {}", path.display()))?;

    match summary.existing {
        Some(before) => println!(
            "{}: {} fetched, {} appended ({} -> {} rows)",
            path.display(),
            summary.fetched,
            summary.appended(),
            before,
            summary.written
        ),
        None => println!(
            "{}: created with {} rows",
            path.display(),
            summary.written
        ),
    }

    Ok(())
}
