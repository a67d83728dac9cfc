//! Check subcommand - list remote bulletins not held locally

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use irbfetch_bulletins::{Checker, Config, check_report};
use irbfetch_core::{HttpFetcher, SharedProgress};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Number of most recent bulletins to check (0 = all)
    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,

    /// Maximum listing pages to check
    #[arg(long)]
    pub check_pages: Option<usize>,

    /// Save the check report to this file
    #[arg(long)]
    pub report_file: Option<PathBuf>,

    /// Print results as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: CheckArgs, mut config: Config, progress: &SharedProgress) -> Result<()> {
    if args.check_pages.is_some() {
        config.max_pages = args.check_pages;
    }

    let fetcher = HttpFetcher::new(config.http.clone())?;
    let results = Checker::new(&fetcher, &config, progress).check_for_new(Some(args.limit))?;
    let report = check_report(&results, args.report_file.as_deref());

    if args.json {
        let json = serde_json::to_string_pretty(&results).context("Failed to encode results")?;
        println!("{json}");
    } else {
        print!("{report}");
    }
    Ok(())
}
