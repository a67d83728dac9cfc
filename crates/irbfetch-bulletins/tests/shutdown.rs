//! Behavior once shutdown has been requested
//!
//! The shutdown flag is process-global and never cleared, so every test in
//! this binary runs with it set.

use std::fs;
use std::sync::Mutex;
use std::time::Duration;

use irbfetch_bulletins::{Config, DocumentLink, LinkCollector, Status, download_all, run};
use irbfetch_core::{FetchError, Fetcher, ProgressContext, Response, request_shutdown};
use tempfile::TempDir;

const ORIGIN: &str = "https://irs.test";

/// Serves a one-page listing and any bulletin, recording every request
#[derive(Default)]
struct CountingSite {
    requested: Mutex<Vec<String>>,
}

impl CountingSite {
    fn requests(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Fetcher for CountingSite {
    fn fetch(&self, url: &str, _stream: bool) -> Result<Response, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        if url.ends_with(".pdf") {
            let mut body = b"%PDF-1.7\n".to_vec();
            body.resize(4096, b'.');
            return Ok(Response::from_bytes(200, body));
        }
        Ok(Response::from_bytes(
            200,
            "<html><body><a href=\"/pub/irs-irbs/irb24-01.pdf\">IRB 2024-01</a></body></html>",
        ))
    }
}

fn config_in(dir: &TempDir) -> Config {
    Config {
        output_dir: dir.path().join("irs_bulletins"),
        ledger_path: dir.path().join("irs_bulletins_summary.csv"),
        listing_url: format!("{ORIGIN}/internal-revenue-bulletins"),
        site_origin: ORIGIN.to_string(),
        workers: 2,
        page_delay: Duration::ZERO,
        ..Default::default()
    }
}

fn link(name: &str) -> DocumentLink {
    DocumentLink::new(name, format!("{ORIGIN}/pub/irs-irbs/{name}"))
}

#[test]
fn crawl_fetches_nothing() {
    request_shutdown();
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let site = CountingSite::default();
    let progress = ProgressContext::hidden();

    let links = LinkCollector::new(&site, &config, &progress)
        .unwrap()
        .collect_all_links(Some(5));

    assert!(links.is_empty());
    assert!(site.requests().is_empty());
}

#[test]
fn download_keeps_only_files_already_present() {
    request_shutdown();
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    fs::create_dir_all(&config.output_dir).unwrap();
    fs::write(config.output_dir.join("irb24-02.pdf"), b"%PDF-1.7\n").unwrap();
    let site = CountingSite::default();

    let links = [link("irb24-01.pdf"), link("irb24-02.pdf")];
    let outcomes = download_all(&links, &site, &config, &ProgressContext::hidden()).unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].filename, "irb24-02.pdf");
    assert_eq!(outcomes[0].status, Status::Skipped);
    assert!(site.requests().is_empty());
    assert!(!config.output_dir.join("irb24-01.pdf").exists());
    assert!(!config.output_dir.join("irb24-01.pdf.tmp").exists());
}

#[test]
fn pipeline_returns_empty_summary() {
    request_shutdown();
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let site = CountingSite::default();

    let summary = run(&config, &site, &ProgressContext::hidden()).unwrap();

    assert_eq!(summary.total_links, 0);
    assert_eq!(summary.downloaded, 0);
    assert!(site.requests().is_empty());
    assert!(!config.ledger_path.exists());
}
