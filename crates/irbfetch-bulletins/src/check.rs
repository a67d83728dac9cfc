//! Compare the remote listing with what is held locally

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;
use irbfetch_core::{Fetcher, ProgressContext};
use serde::Serialize;

use crate::config::Config;
use crate::crawl::LinkCollector;
use crate::ledger::Ledger;
use crate::report::write_report;
use crate::state::{DocumentLink, now_timestamp};
use crate::validate::Inventory;

/// Bulletins shown per listing page
const LINKS_PER_PAGE: usize = 20;
/// Limits up to this size also cap how many pages are crawled
const PAGE_CAP_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct CheckResults {
    pub total_remote_checked: usize,
    pub total_local: usize,
    pub new_bulletins: Vec<DocumentLink>,
    pub check_timestamp: String,
}

/// Pages needed to see roughly `limit` bulletins
pub fn pages_for_limit(limit: usize) -> usize {
    (limit / LINKS_PER_PAGE + 1).max(1)
}

pub struct Checker<'a> {
    fetcher: &'a dyn Fetcher,
    config: &'a Config,
    progress: &'a ProgressContext,
}

impl<'a> Checker<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, config: &'a Config, progress: &'a ProgressContext) -> Self {
        Self {
            fetcher,
            config,
            progress,
        }
    }

    /// Filenames on disk plus ledger rows whose bytes are held locally
    pub fn local_bulletins(&self) -> BTreeSet<String> {
        let mut local: BTreeSet<String> = Inventory::new(&self.config.output_dir)
            .pdf_files()
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();

        let ledger = Ledger::new(&self.config.ledger_path).load();
        local.extend(
            ledger
                .into_values()
                .filter(|r| r.status.is_local())
                .map(|r| r.filename),
        );
        log::info!("Found {} local bulletins", local.len());
        local
    }

    /// The first `limit` bulletins of the listing (all when `None` or 0).
    pub fn remote_bulletins(&self, limit: Option<usize>) -> Result<Vec<DocumentLink>> {
        let limit = limit.filter(|&n| n > 0);
        let max_pages = match limit {
            Some(n) if n <= PAGE_CAP_LIMIT => Some(pages_for_limit(n)),
            _ => self.config.max_pages,
        };

        let mut links =
            LinkCollector::new(self.fetcher, self.config, self.progress)?.collect_all_links(max_pages);
        if let Some(n) = limit {
            links.truncate(n);
        }
        Ok(links)
    }

    pub fn check_for_new(&self, limit: Option<usize>) -> Result<CheckResults> {
        log::info!("Checking for new bulletins...");
        let local = self.local_bulletins();
        let remote = self.remote_bulletins(limit)?;

        let total_remote_checked = remote.len();
        let new_bulletins: Vec<DocumentLink> = remote
            .into_iter()
            .filter(|link| !local.contains(&link.filename))
            .collect();

        if new_bulletins.is_empty() {
            log::info!("No new bulletins found");
        } else {
            log::info!("Found {} new bulletins", new_bulletins.len());
            for link in &new_bulletins {
                log::info!("  new: {}", link.filename);
            }
        }

        Ok(CheckResults {
            total_remote_checked,
            total_local: local.len(),
            new_bulletins,
            check_timestamp: now_timestamp(),
        })
    }
}

/// Render `results` as text, also writing it to `save_to` when given.
pub fn check_report(results: &CheckResults, save_to: Option<&Path>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "IRS Bulletins Check Report");
    let _ = writeln!(out, "{}", "=".repeat(30));
    let _ = writeln!(out, "Check timestamp: {}", results.check_timestamp);
    let _ = writeln!(out, "Total remote bulletins checked: {}", results.total_remote_checked);
    let _ = writeln!(out, "Total local bulletins: {}", results.total_local);
    let _ = writeln!(out, "New bulletins found: {}", results.new_bulletins.len());
    let _ = writeln!(out);

    if results.new_bulletins.is_empty() {
        let _ = writeln!(out, "No new bulletins found.");
    } else {
        let _ = writeln!(out, "New bulletins available:");
        let _ = writeln!(out, "{}", "-".repeat(25));
        for link in &results.new_bulletins {
            let _ = writeln!(out, "  • {}", link.filename);
            let _ = writeln!(out, "    URL: {}", link.url);
            let _ = writeln!(out);
        }
    }

    if let Some(path) = save_to {
        write_report(path, &out);
    }
    out
}
