//! Validation, statistics and cleanup of stored bulletins

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::report::write_report;
use crate::state::bytes_to_mb;

/// Bytes inspected for a signature
const HEADER_LEN: u64 = 1024;
/// Window in which a bare "PDF" marker is accepted
const MARKER_WINDOW: usize = 100;
/// Files without a signature are accepted from this size on
const MIN_UNSIGNED_SIZE: u64 = 1024;

/// Whether `path` looks like a usable bulletin.
///
/// Empty files are invalid. Otherwise a `%PDF` prefix, a "PDF" marker in
/// the first 100 bytes or a `%!PS` prefix is accepted; failing those, any
/// file of at least 1 KiB passes. I/O errors count as invalid.
pub fn is_valid(path: &Path) -> bool {
    match check_file(path) {
        Ok(valid) => valid,
        Err(e) => {
            log::warn!("Could not validate {}: {e}", path.display());
            false
        }
    }
}

fn check_file(path: &Path) -> io::Result<bool> {
    let size = fs::metadata(path)?.len();
    if size == 0 {
        return Ok(false);
    }

    let mut header = Vec::with_capacity(HEADER_LEN as usize);
    File::open(path)?.take(HEADER_LEN).read_to_end(&mut header)?;

    let window = &header[..header.len().min(MARKER_WINDOW)];
    if header.starts_with(b"%PDF")
        || window.windows(3).any(|w| w == b"PDF")
        || header.starts_with(b"%!PS")
    {
        return Ok(true);
    }
    Ok(size >= MIN_UNSIGNED_SIZE)
}

/// Aggregate view of the stored bulletins
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulletinStatistics {
    pub total_files: usize,
    pub total_size_mb: f64,
    pub valid_files: usize,
    pub invalid_files: usize,
    pub average_size_mb: f64,
}

/// Files found invalid by [`Inventory::cleanup`] and what happened to them
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub invalid: Vec<String>,
    /// Empty on a dry run
    pub deleted: Vec<String>,
    pub failed: Vec<(String, io::Error)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileMetadata {
    pub filename: String,
    pub size_bytes: u64,
    pub size_mb: f64,
    pub modified: Option<DateTime<Local>>,
    pub is_valid: bool,
}

/// The bulletin PDFs stored in one directory
pub struct Inventory {
    dir: PathBuf,
}

impl Inventory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `*.pdf` files in the directory, sorted by name
    pub fn pdf_files(&self) -> Vec<PathBuf> {
        let pattern = format!(
            "{}/*.pdf",
            glob::Pattern::escape(&self.dir.to_string_lossy())
        );
        let mut files: Vec<PathBuf> = match glob::glob(&pattern) {
            Ok(paths) => paths.filter_map(Result::ok).filter(|p| p.is_file()).collect(),
            Err(e) => {
                log::warn!("Bad file pattern {pattern}: {e}");
                Vec::new()
            }
        };
        files.sort();
        files
    }

    /// Validity of every stored PDF, keyed by filename.
    pub fn validate_all(&self) -> BTreeMap<String, bool> {
        let mut results = BTreeMap::new();
        if !self.dir.is_dir() {
            log::warn!("Bulletin directory {} does not exist", self.dir.display());
            return results;
        }

        for path in self.pdf_files() {
            let valid = is_valid(&path);
            let name = file_name(&path);
            if !valid {
                match fs::metadata(&path) {
                    Ok(meta) if meta.len() == 0 => log::warn!("Empty file: {name}"),
                    _ => log::warn!("Invalid PDF: {name}"),
                }
            }
            results.insert(name, valid);
        }

        let valid = results.values().filter(|v| **v).count();
        log::info!("Validation: {valid}/{} files valid", results.len());
        results
    }

    pub fn statistics(&self) -> BulletinStatistics {
        let files = self.pdf_files();
        let mut total_bytes = 0u64;
        let mut valid_files = 0;
        for path in &files {
            total_bytes += fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            if is_valid(path) {
                valid_files += 1;
            }
        }

        let total_files = files.len();
        let average_size_mb = if total_files == 0 {
            0.0
        } else {
            bytes_to_mb((total_bytes as f64 / total_files as f64).round() as u64)
        };
        BulletinStatistics {
            total_files,
            total_size_mb: bytes_to_mb(total_bytes),
            valid_files,
            invalid_files: total_files - valid_files,
            average_size_mb,
        }
    }

    /// Delete invalid files, or only list them when `dry_run` is set.
    pub fn cleanup(&self, dry_run: bool) -> CleanupReport {
        let mut report = CleanupReport {
            invalid: self
                .validate_all()
                .into_iter()
                .filter_map(|(name, valid)| (!valid).then_some(name))
                .collect(),
            ..Default::default()
        };

        if report.invalid.is_empty() {
            log::info!("No invalid files found");
            return report;
        }
        if dry_run {
            log::info!("Dry run: would delete {} invalid files", report.invalid.len());
            for name in &report.invalid {
                log::info!("  would delete {name}");
            }
            return report;
        }

        for name in &report.invalid {
            match fs::remove_file(self.dir.join(name)) {
                Ok(()) => {
                    log::info!("Deleted invalid file: {name}");
                    report.deleted.push(name.clone());
                }
                Err(e) => {
                    log::error!("Failed to delete {name}: {e}");
                    report.failed.push((name.clone(), e));
                }
            }
        }
        log::info!("Deleted {} invalid files", report.deleted.len());
        report
    }

    /// Size, mtime and validity of one stored file; `None` if absent.
    pub fn file_metadata(&self, filename: &str) -> Option<FileMetadata> {
        let path = self.dir.join(filename);
        let meta = fs::metadata(&path).ok().filter(|m| m.is_file())?;
        Some(FileMetadata {
            filename: filename.to_string(),
            size_bytes: meta.len(),
            size_mb: bytes_to_mb(meta.len()),
            modified: meta.modified().ok().map(DateTime::<Local>::from),
            is_valid: is_valid(&path),
        })
    }

    /// Human-readable inventory, also written to `save_to` when given.
    pub fn inventory_report(&self, save_to: Option<&Path>) -> String {
        let stats = self.statistics();
        let mut out = String::new();
        let _ = writeln!(out, "IRS Bulletins Inventory Report");
        let _ = writeln!(out, "{}", "=".repeat(35));
        let _ = writeln!(out, "Total files: {}", stats.total_files);
        let _ = writeln!(out, "Total size: {:.2} MB", stats.total_size_mb);
        let _ = writeln!(out, "Valid files: {}", stats.valid_files);
        let _ = writeln!(out, "Invalid files: {}", stats.invalid_files);
        let _ = writeln!(out, "Average file size: {:.2} MB", stats.average_size_mb);
        let _ = writeln!(out);
        let _ = writeln!(out, "File Details:");
        let _ = writeln!(out, "{}", "-".repeat(15));

        for path in self.pdf_files() {
            let name = file_name(&path);
            let Some(meta) = self.file_metadata(&name) else {
                continue;
            };
            let mark = if meta.is_valid { '✓' } else { '✗' };
            let _ = writeln!(out, "{mark} {name} ({:.2} MB)", meta.size_mb);
        }

        if let Some(path) = save_to {
            write_report(path, &out);
        }
        out
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
