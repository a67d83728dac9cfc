//! irbfetch Bulletins - Internal Revenue Bulletin acquisition
//!
//! Crawls the paginated IRS bulletin listing, downloads every bulletin PDF
//! not already on disk, and records each outcome in a CSV ledger.
//!
//! # Features
//!
//! - Polite sequential crawl with de-duplication and several stop conditions
//! - Parallel streaming downloads with rayon, written via tmp-then-rename
//! - Idempotent re-runs: existing files are skipped without a request
//! - Offline validation, statistics, cleanup and inventory reports
//!
//! # Example
//!
//! ```ignore
//! use irbfetch_bulletins::{Config, run};
//! use irbfetch_core::{HttpFetcher, ProgressContext};
//!
//! let config = Config {
//!     max_pages: Some(1),
//!     ..Default::default()
//! };
//! let fetcher = HttpFetcher::new(config.http.clone())?;
//!
//! let summary = run(&config, &fetcher, &ProgressContext::new())?;
//! println!("Downloaded {} bulletins", summary.downloaded);
//! ```

pub mod check;
pub mod config;
pub mod crawl;
pub mod ledger;
pub mod parser;
pub mod report;
pub mod runner;
pub mod state;
pub mod validate;
pub mod worker;

// Re-exports
pub use check::{CheckResults, Checker, check_report};
pub use config::Config;
pub use crawl::LinkCollector;
pub use ledger::Ledger;
pub use parser::{ListingPage, PageParser};
pub use runner::{Summary, download_all, run};
pub use state::{DocumentLink, DownloadOutcome, LedgerRecord, Status};
pub use validate::{BulletinStatistics, CleanupReport, FileMetadata, Inventory, is_valid};
pub use worker::download_one;
