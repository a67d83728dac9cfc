//! Main runner for the bulletin pipeline

use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use irbfetch_core::{Fetcher, ProgressContext, WorkQueue, is_shutdown_requested};

use crate::config::Config;
use crate::crawl::LinkCollector;
use crate::ledger::Ledger;
use crate::state::{DocumentLink, DownloadOutcome, Status};
use crate::worker;

/// Pipeline execution summary
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_links: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Megabytes fetched during this run
    pub downloaded_mb: f64,
    pub elapsed: Duration,
}

impl Summary {
    pub fn empty(elapsed: Duration) -> Self {
        Self {
            total_links: 0,
            downloaded: 0,
            skipped: 0,
            failed: 0,
            downloaded_mb: 0.0,
            elapsed,
        }
    }

    pub fn from_outcomes(total_links: usize, outcomes: &[DownloadOutcome], elapsed: Duration) -> Self {
        let count = |status: Status| outcomes.iter().filter(|o| o.status == status).count();
        Self {
            total_links,
            downloaded: count(Status::Downloaded),
            skipped: count(Status::Skipped),
            failed: count(Status::Failed),
            downloaded_mb: outcomes
                .iter()
                .filter(|o| o.status == Status::Downloaded)
                .map(|o| o.size_mb)
                .sum(),
            elapsed,
        }
    }

    pub fn log(&self) {
        log::info!("=== IRS Bulletin Download Summary ===");
        log::info!("Bulletins found: {}", self.total_links);
        log::info!(
            "Downloaded: {} ({:.2} MB), skipped: {}, failed: {}",
            self.downloaded,
            self.downloaded_mb,
            self.skipped,
            self.failed
        );
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
    }
}

/// Download every link with a bounded worker pool.
///
/// Links whose file already exists become `skipped` outcomes without a
/// request and are listed first; the rest follow in completion order.
/// One outcome is returned per link unless shutdown was requested, in
/// which case unclaimed links are left out.
pub fn download_all(
    links: &[DocumentLink],
    fetcher: &dyn Fetcher,
    config: &Config,
    progress: &ProgressContext,
) -> Result<Vec<DownloadOutcome>> {
    let (present, pending): (Vec<&DocumentLink>, Vec<&DocumentLink>) = links
        .iter()
        .partition(|link| config.output_dir.join(&link.filename).exists());

    let mut outcomes: Vec<DownloadOutcome> = present
        .iter()
        .map(|link| {
            let size = std::fs::metadata(config.output_dir.join(&link.filename))
                .map(|m| m.len())
                .unwrap_or(0);
            DownloadOutcome::skipped(&link.filename, size)
        })
        .collect();

    log::info!(
        "{} of {} bulletins already present, {} to download",
        present.len(),
        links.len(),
        pending.len()
    );
    if pending.is_empty() {
        return Ok(outcomes);
    }

    let workers = config.worker_count().min(pending.len());
    log::info!("Downloading {} bulletins with {workers} workers", pending.len());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("Failed to create thread pool")?;

    let queue = WorkQueue::new(pending);
    let done = AtomicUsize::new(0);
    let status = progress.stage_line("download");
    let results = Mutex::new(Vec::with_capacity(queue.total()));

    pool.scope(|s| {
        for _ in 0..workers {
            s.spawn(|_| {
                while !is_shutdown_requested() {
                    let Some(link) = queue.next() else { break };
                    let pb = progress.download_bar(&link.filename);
                    let outcome = worker::download_one(link, fetcher, config, &pb);
                    pb.finish_and_clear();

                    let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                    status.set_message(format!("{n}/{} documents", queue.total()));
                    results
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(outcome);
                }
            });
        }
    });
    status.finish_and_clear();

    if is_shutdown_requested() {
        log::warn!(
            "Shutdown requested, {} bulletins were not attempted",
            queue.remaining()
        );
    }

    outcomes.extend(results.into_inner().unwrap_or_else(PoisonError::into_inner));
    Ok(outcomes)
}

/// Crawl, download and record: the full acquisition pipeline.
pub fn run(config: &Config, fetcher: &dyn Fetcher, progress: &ProgressContext) -> Result<Summary> {
    let start = Instant::now();

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;
    match worker::cleanup_tmp_files(&config.output_dir) {
        Ok(0) => {}
        Ok(n) => log::info!("Removed {n} stale tmp files"),
        Err(e) => log::warn!("Could not scan for stale tmp files: {e}"),
    }

    log::info!("Collecting bulletin links from {}", config.listing_url);
    let links = LinkCollector::new(fetcher, config, progress)?.collect_all_links(config.max_pages);
    if links.is_empty() {
        log::warn!("No bulletin links found, nothing to download");
        return Ok(Summary::empty(start.elapsed()));
    }

    let outcomes = download_all(&links, fetcher, config, progress)?;
    Ledger::new(&config.ledger_path).save(&outcomes);

    let summary = Summary::from_outcomes(links.len(), &outcomes, start.elapsed());
    summary.log();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    use irbfetch_core::{FetchError, Response};
    use tempfile::TempDir;

    use crate::crawl::tests::{FakeSite, page, test_config};
    use crate::worker::tests::{Body, FakeDocs, pdf_bytes};

    fn link(name: &str) -> DocumentLink {
        DocumentLink::new(name, format!("https://example.test/pub/irs-irbs/{name}"))
    }

    fn config_in(dir: &TempDir) -> Config {
        Config {
            output_dir: dir.path().join("pdfs"),
            ledger_path: dir.path().join("summary.csv"),
            workers: 3,
            ..test_config()
        }
    }

    fn by_name(outcomes: &[DownloadOutcome]) -> HashMap<&str, Status> {
        outcomes
            .iter()
            .map(|o| (o.filename.as_str(), o.status))
            .collect()
    }

    #[test]
    fn one_broken_stream_among_five() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        fs::create_dir_all(&config.output_dir).unwrap();

        let links: Vec<DocumentLink> = (1..=5).map(|i| link(&format!("irb24-0{i}.pdf"))).collect();
        let mut fetcher = FakeDocs::default();
        for (i, l) in links.iter().enumerate() {
            let body = if i == 2 {
                Body::BrokenAfter(pdf_bytes(4000))
            } else {
                Body::Bytes(pdf_bytes(4000))
            };
            fetcher = fetcher.serve(&l.url, body);
        }

        let outcomes =
            download_all(&links, &fetcher, &config, &ProgressContext::hidden()).unwrap();

        assert_eq!(outcomes.len(), 5);
        let statuses = by_name(&outcomes);
        assert_eq!(statuses["irb24-03.pdf"], Status::Failed);
        assert_eq!(
            statuses.values().filter(|s| **s == Status::Downloaded).count(),
            4
        );
        assert!(!config.output_dir.join("irb24-03.pdf").exists());
        assert!(!config.output_dir.join("irb24-03.pdf.tmp").exists());
        assert_eq!(
            fs::read(config.output_dir.join("irb24-05.pdf")).unwrap(),
            pdf_bytes(4000)
        );
    }

    #[test]
    fn existing_files_skipped_first_without_requests() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        fs::create_dir_all(&config.output_dir).unwrap();
        fs::write(config.output_dir.join("irb24-02.pdf"), pdf_bytes(100)).unwrap();

        let links = vec![link("irb24-01.pdf"), link("irb24-02.pdf")];
        let fetcher = FakeDocs::default().serve(&links[0].url, Body::Bytes(pdf_bytes(100)));

        let outcomes =
            download_all(&links, &fetcher, &config, &ProgressContext::hidden()).unwrap();

        assert_eq!(outcomes[0].filename, "irb24-02.pdf");
        assert_eq!(outcomes[0].status, Status::Skipped);
        assert_eq!(outcomes[0].timestamp, "existing");
        assert_eq!(outcomes[1].status, Status::Downloaded);
        assert_eq!(fetcher.request_count(), 1);
    }

    #[test]
    fn empty_input_returns_empty() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let outcomes =
            download_all(&[], &FakeDocs::default(), &config, &ProgressContext::hidden()).unwrap();
        assert!(outcomes.is_empty());
    }

    #[test]
    fn summary_counts() {
        let outcomes = vec![
            DownloadOutcome::downloaded("a.pdf", 1024 * 1024),
            DownloadOutcome::downloaded("b.pdf", 512 * 1024),
            DownloadOutcome::skipped("c.pdf", 10),
            DownloadOutcome::failed("d.pdf"),
        ];
        let summary = Summary::from_outcomes(4, &outcomes, Duration::from_secs(2));
        assert_eq!(summary.downloaded, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.downloaded_mb, 1.5);
    }

    /// Serves both the listing and the documents
    struct FakeWeb {
        site: FakeSite,
        docs: FakeDocs,
    }

    impl Fetcher for FakeWeb {
        fn fetch(&self, url: &str, stream: bool) -> Result<Response, FetchError> {
            if url.contains("/pub/") {
                self.docs.fetch(url, stream)
            } else {
                self.site.fetch(url, stream)
            }
        }
    }

    #[test]
    fn run_twice_skips_everything_second_time() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let web = FakeWeb {
            site: FakeSite::default()
                .with_page(0, page(&["irb24-02.pdf"], true))
                .with_page(1, page(&["irb24-01.pdf"], false)),
            docs: FakeDocs::default()
                .serve(&link("irb24-02.pdf").url, Body::Bytes(pdf_bytes(2048)))
                .serve(&link("irb24-01.pdf").url, Body::Bytes(pdf_bytes(2048))),
        };
        let progress = ProgressContext::hidden();

        let first = run(&config, &web, &progress).unwrap();
        assert_eq!(first.total_links, 2);
        assert_eq!(first.downloaded, 2);

        let second = run(&config, &web, &progress).unwrap();
        assert_eq!(second.downloaded, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(web.docs.request_count(), 2);

        let ledger = Ledger::new(&config.ledger_path).load();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.values().all(|r| r.status == Status::Skipped));
    }

    #[test]
    fn run_without_links_writes_no_ledger() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let summary = run(&config, &FakeSite::default(), &ProgressContext::hidden()).unwrap();

        assert_eq!(summary.total_links, 0);
        assert!(config.output_dir.is_dir());
        assert!(!config.ledger_path.exists());
    }

    #[test]
    fn run_clears_stale_tmp_files() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        fs::create_dir_all(&config.output_dir).unwrap();
        fs::write(config.output_dir.join("irb24-09.pdf.tmp"), b"partial").unwrap();

        run(&config, &FakeSite::default(), &ProgressContext::hidden()).unwrap();

        assert!(!config.output_dir.join("irb24-09.pdf.tmp").exists());
    }
}
