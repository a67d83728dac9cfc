//! Saving text reports

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Write `text` to `path`, creating parent directories.
pub fn try_write_report(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

/// Best-effort [`try_write_report`]; failures are logged.
pub fn write_report(path: &Path, text: &str) -> bool {
    match try_write_report(path, text) {
        Ok(()) => {
            log::info!("Report saved to {}", path.display());
            true
        }
        Err(e) => {
            log::error!("Failed to save report: {e:#}");
            false
        }
    }
}
