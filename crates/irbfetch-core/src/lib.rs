//! irbfetch Core - Common infrastructure for bulletin acquisition
//!
//! This crate provides the reusable pieces the bulletin pipeline is built on:
//! a blocking HTTP fetcher with retry and exponential backoff, logging that
//! cooperates with progress bars, a shutdown flag, and a lock-free work queue.

pub mod error;
pub mod http;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod shutdown;
pub mod work_queue;

// Re-exports for convenience
pub use error::FetchError;
pub use http::{Fetcher, HttpConfig, HttpFetcher, Response, SHARED_RUNTIME};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress};
pub use retry::{SleepFn, backoff_duration, retry_with_backoff};
pub use shutdown::{
    install_signal_handlers, is_shutdown_requested, request_shutdown, shutdown_flag,
};
pub use work_queue::WorkQueue;
