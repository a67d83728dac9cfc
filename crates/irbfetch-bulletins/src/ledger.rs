//! CSV ledger of processed bulletins
//!
//! One row per filename with columns `file_name,file_size_mb,
//! download_timestamp,status`. Rows are merged by filename (latest wins)
//! and written sorted, so saving the same outcomes twice yields the same
//! bytes.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::state::{DownloadOutcome, LedgerRecord};

/// Column order of the ledger file
pub const LEDGER_HEADER: [&str; 4] = ["file_name", "file_size_mb", "download_timestamp", "status"];

pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the ledger, keyed by filename. A missing file is an empty ledger.
    ///
    /// Rows that fail to parse are logged and skipped so one bad line does
    /// not cost the rest of the history.
    pub fn try_load(&self) -> Result<BTreeMap<String, LedgerRecord>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open ledger {}", self.path.display()))?;

        let mut records = BTreeMap::new();
        for row in reader.deserialize::<LedgerRecord>() {
            match row {
                Ok(record) => {
                    records.insert(record.filename.clone(), record);
                }
                Err(e) => log::warn!("Skipping malformed row in {}: {e}", self.path.display()),
            }
        }
        Ok(records)
    }

    /// Like [`try_load`](Self::try_load), but an unreadable ledger is
    /// treated as empty.
    pub fn load(&self) -> BTreeMap<String, LedgerRecord> {
        self.try_load().unwrap_or_else(|e| {
            log::warn!("Could not read existing ledger, starting fresh: {e:#}");
            BTreeMap::new()
        })
    }

    /// Merge `outcomes` into the ledger and rewrite it. Returns the row count.
    pub fn try_save(&self, outcomes: &[DownloadOutcome]) -> Result<usize> {
        let mut records = self.load();
        for outcome in outcomes {
            records.insert(outcome.filename.clone(), outcome.clone());
        }
        self.write(&records)?;
        Ok(records.len())
    }

    /// Best-effort [`try_save`](Self::try_save); failures are logged.
    pub fn save(&self, outcomes: &[DownloadOutcome]) {
        match self.try_save(outcomes) {
            Ok(rows) => log::info!("Ledger updated: {} ({rows} rows)", self.path.display()),
            Err(e) => log::error!("Failed to save ledger: {e:#}"),
        }
    }

    /// Write to `<path>.tmp`, then rename into place.
    fn write(&self, records: &BTreeMap<String, LedgerRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let tmp_path = self.path.with_extension("csv.tmp");
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&tmp_path)
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
        writer.write_record(LEDGER_HEADER)?;
        for record in records.values() {
            writer.serialize(record)?;
        }
        writer.flush()?;
        drop(writer);

        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to move ledger into {}", self.path.display()))?;
        Ok(())
    }
}
