//! Error type for HTTP fetch attempts

use std::time::Duration;

/// Error from a single fetch attempt, or the terminal error after all
/// attempts were used up.
#[derive(Debug)]
pub enum FetchError {
    /// Server answered with a non-success status
    Status(u16),
    /// Connection, TLS or protocol failure
    Transport(String),
    /// No response (or no body data) within the request timeout
    Timeout(Duration),
    /// Local I/O failure while reading the body
    Io(std::io::Error),
    /// Every attempt failed; `last` is the error of the final attempt
    Exhausted {
        url: String,
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(s) => write!(f, "HTTP status {s}"),
            Self::Transport(message) => write!(f, "HTTP error: {message}"),
            Self::Timeout(d) => write!(f, "timed out after {}s", d.as_secs()),
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Exhausted {
                url,
                attempts,
                last,
            } => write!(f, "all {attempts} attempts failed for {url}: {last}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Exhausted { last, .. } => Some(last.as_ref()),
            _ => None,
        }
    }
}

impl FetchError {
    /// Create transport error from reqwest error
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Status(status.as_u16()),
            None => Self::Transport(e.to_string()),
        }
    }

    /// HTTP status of the failing response, looking through `Exhausted`.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(s) => Some(*s),
            Self::Exhausted { last, .. } => last.status(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
