//! Bulletin pipeline configuration

use std::path::PathBuf;
use std::time::Duration;

use irbfetch_core::HttpConfig;

/// Runtime configuration for the bulletin pipeline
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding downloaded PDFs
    pub output_dir: PathBuf,
    /// CSV ledger of processed documents
    pub ledger_path: PathBuf,
    /// First listing page; page N > 0 is `{listing_url}?page=N`
    pub listing_url: String,
    /// Origin that relative document links are resolved against
    pub site_origin: String,
    /// Concurrent download workers
    pub workers: usize,
    /// Maximum listing pages to crawl (`None` = until the listing ends)
    pub max_pages: Option<usize>,
    /// Pause between listing pages
    pub page_delay: Duration,
    /// Buffer size for streaming a document to disk
    pub chunk_size: usize,
    /// Request timeout and retry count
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/raw/irs_bulletins"),
            ledger_path: PathBuf::from("data/raw/irs_bulletins_summary.csv"),
            listing_url: "https://www.irs.gov/internal-revenue-bulletins".to_string(),
            site_origin: "https://www.irs.gov".to_string(),
            workers: 5,
            max_pages: None,
            page_delay: Duration::from_secs(1),
            chunk_size: 8192,
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// URL of listing page `page_num` (zero-based)
    pub fn page_url(&self, page_num: usize) -> String {
        if page_num == 0 {
            self.listing_url.clone()
        } else {
            format!("{}?page={page_num}", self.listing_url)
        }
    }

    /// Worker count clamped to at least one thread
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }
}
