//! Download subcommand - crawl the listing and fetch new bulletins

use anyhow::Result;
use clap::Args;

use irbfetch_bulletins::Config;
use irbfetch_core::{HttpFetcher, SharedProgress};

use super::print_summary;

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Number of concurrent downloads
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Maximum listing pages to crawl (default: until the listing ends)
    #[arg(short = 'p', long)]
    pub max_pages: Option<usize>,
}

/// Failed downloads are reported in the summary, not as an error exit.
pub fn run(args: DownloadArgs, mut config: Config, progress: &SharedProgress) -> Result<()> {
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if args.max_pages.is_some() {
        config.max_pages = args.max_pages;
    }

    let fetcher = HttpFetcher::new(config.http.clone())?;
    let summary = irbfetch_bulletins::run(&config, &fetcher, progress)?;

    print_summary(
        "IRS Bulletins",
        &[
            ("Found", summary.total_links.to_string()),
            (
                "Downloaded",
                format!("{} ({:.2} MB)", summary.downloaded, summary.downloaded_mb),
            ),
            ("Skipped", summary.skipped.to_string()),
            ("Failed", summary.failed.to_string()),
            ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
            ("Ledger", config.ledger_path.display().to_string()),
        ],
    );
    Ok(())
}
