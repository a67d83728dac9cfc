//! Worker for downloading one bulletin PDF

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use irbfetch_core::Fetcher;
use irbfetch_core::progress::upgrade_to_bar;

use crate::config::Config;
use crate::state::{DocumentLink, DownloadOutcome};

/// Suffix of in-progress downloads
const TMP_SUFFIX: &str = "tmp";

/// Download a single bulletin into `config.output_dir`.
///
/// A file already present under the final name yields a `skipped` outcome
/// without touching the network. The body is streamed to `<name>.tmp` in
/// `chunk_size` pieces and renamed into place; on any failure the partial
/// file is removed and a `failed` outcome is returned.
pub fn download_one(
    link: &DocumentLink,
    fetcher: &dyn Fetcher,
    config: &Config,
    pb: &ProgressBar,
) -> DownloadOutcome {
    let final_path = config.output_dir.join(&link.filename);

    if let Ok(meta) = fs::metadata(&final_path) {
        log::info!("Skipping {} (already exists)", link.filename);
        return DownloadOutcome::skipped(&link.filename, meta.len());
    }

    log::info!("Downloading {} from {}", link.filename, link.url);
    pb.set_message("connecting...");
    let response = match fetcher.fetch(&link.url, true) {
        Ok(r) => r,
        Err(e) => {
            log::error!("Failed to download {}: {e}", link.filename);
            return DownloadOutcome::failed(&link.filename);
        }
    };

    if let Some(total) = response.content_length() {
        upgrade_to_bar(pb, total);
    }

    let tmp_path = tmp_path_for(&final_path);
    let written = stream_to_file(response.into_reader(), &tmp_path, config.chunk_size, pb)
        .and_then(|n| fs::rename(&tmp_path, &final_path).map(|()| n));

    match written {
        Ok(n) => {
            let size = fs::metadata(&final_path).map(|m| m.len()).unwrap_or(n);
            let outcome = DownloadOutcome::downloaded(&link.filename, size);
            log::info!("Downloaded {} ({:.2} MB)", link.filename, outcome.size_mb);
            outcome
        }
        Err(e) => {
            log::error!("Error saving {}: {e}", link.filename);
            remove_partial(&tmp_path);
            DownloadOutcome::failed(&link.filename)
        }
    }
}

/// Copy `reader` into a new file at `path`, `chunk_size` bytes at a time.
fn stream_to_file(
    mut reader: impl Read,
    path: &Path,
    chunk_size: usize,
    pb: &ProgressBar,
) -> io::Result<u64> {
    let mut file = File::create(path)?;
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        file.write_all(&buf[..n])?;
        total += n as u64;
        pb.inc(n as u64);
    }
    file.sync_all()?;
    Ok(total)
}

fn tmp_path_for(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_owned();
    name.push(".");
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

fn remove_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            log::warn!("Could not remove partial file {}: {e}", path.display());
        }
    }
}

/// Remove stale .tmp files left in the output directory by an interrupted run
pub fn cleanup_tmp_files(output_dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(output_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == TMP_SUFFIX) {
            log::warn!("Removing stale tmp file: {}", path.display());
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}
