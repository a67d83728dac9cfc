//! Pipeline state types: discovered links and per-document outcomes

use serde::{Deserialize, Serialize, Serializer};

/// Timestamp recorded for documents that were already on disk
pub const EXISTING_TIMESTAMP: &str = "existing";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One bulletin PDF found on a listing page. Unique by `filename`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLink {
    pub filename: String,
    pub url: String,
}

impl DocumentLink {
    pub fn new(filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
        }
    }
}

/// Outcome classification of one acquisition attempt.
///
/// `Existing` is never produced by this crate; it is accepted when reading
/// ledgers written by older tooling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Downloaded,
    Skipped,
    Failed,
    Existing,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Downloaded => "downloaded",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::Existing => "existing",
        }
    }

    /// Whether a ledger row with this status means the bytes are held locally
    pub fn is_local(self) -> bool {
        matches!(self, Self::Downloaded | Self::Skipped)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one attempted download; also the persisted ledger row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    #[serde(rename = "file_name")]
    pub filename: String,
    #[serde(rename = "file_size_mb", serialize_with = "two_decimals")]
    pub size_mb: f64,
    /// ISO-8601 local time, or [`EXISTING_TIMESTAMP`]
    #[serde(rename = "download_timestamp")]
    pub timestamp: String,
    pub status: Status,
}

/// Persisted form of a [`DownloadOutcome`]
pub type LedgerRecord = DownloadOutcome;

impl DownloadOutcome {
    pub fn downloaded(filename: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            filename: filename.into(),
            size_mb: bytes_to_mb(size_bytes),
            timestamp: now_timestamp(),
            status: Status::Downloaded,
        }
    }

    pub fn skipped(filename: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            filename: filename.into(),
            size_mb: bytes_to_mb(size_bytes),
            timestamp: EXISTING_TIMESTAMP.to_string(),
            status: Status::Skipped,
        }
    }

    pub fn failed(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            size_mb: 0.0,
            timestamp: now_timestamp(),
            status: Status::Failed,
        }
    }
}

/// Current local time, ISO-8601 with microseconds
pub fn now_timestamp() -> String {
    chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// Bytes to megabytes (1024²), rounded to two decimals
pub fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

fn two_decimals<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{value:.2}"))
}
