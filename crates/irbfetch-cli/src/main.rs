//! irbfetch - IRS Internal Revenue Bulletin downloader
//!
//! Crawls the IRS bulletin listing, downloads new bulletin PDFs, checks for
//! bulletins not yet held locally, and validates what is on disk.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "irbfetch")]
#[command(about = "Download and manage IRS Internal Revenue Bulletins")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "debug")]
    quiet: bool,

    /// Config file path (default: ./irbfetch.toml or ~/.config/irbfetch/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding downloaded PDFs
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// CSV ledger path
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Total attempts per request
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl the listing and download every bulletin not on disk
    Download(cmd::download::DownloadArgs),
    /// Report bulletins listed remotely but not held locally
    Check(cmd::check::CheckArgs),
    /// Validate, clean up and summarize downloaded bulletins
    Process(cmd::process::ProcessArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(irbfetch_core::ProgressContext::new());

    let multi = progress.is_tty().then(|| progress.multi());
    if let Err(e) = irbfetch_core::init_logging(cli.quiet, cli.debug, multi) {
        eprintln!("Logger already initialized: {e}");
    }

    if let Err(e) = irbfetch_core::install_signal_handlers() {
        log::warn!("Could not install signal handlers: {e}");
    }

    // Load configuration
    let file_config = if let Some(path) = &cli.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Config file defaults, CLI overrides
    let mut config = file_config.pipeline();
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(ledger) = cli.ledger {
        config.ledger_path = ledger;
    }
    if let Some(secs) = cli.timeout {
        config.http.timeout = Duration::from_secs(secs);
    }
    if let Some(retries) = cli.max_retries {
        config.http.max_retries = retries;
    }

    match cli.command {
        Command::Download(args) => cmd::download::run(args, config, &progress),
        Command::Check(args) => cmd::check::run(args, config, &progress),
        Command::Process(args) => cmd::process::run(args, &config),
        Command::Config => {
            cmd::print_config(&config);
            Ok(())
        }
    }
}
