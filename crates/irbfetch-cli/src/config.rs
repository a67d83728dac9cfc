//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use irbfetch_core::HttpConfig;

/// Global configuration for irbfetch
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub http: HttpSettings,
    pub crawl: CrawlConfig,
    pub workers: WorkersConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub ledger: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        let defaults = irbfetch_bulletins::Config::default();
        Self {
            dir: defaults.output_dir,
            ledger: defaults.ledger_path,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Seconds
    pub timeout: u64,
    pub max_retries: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        let defaults = HttpConfig::default();
        Self {
            timeout: defaults.timeout.as_secs(),
            max_retries: defaults.max_retries,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub listing_url: String,
    pub site_origin: String,
    pub max_pages: Option<usize>,
    pub page_delay_ms: u64,
    pub chunk_size: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        let defaults = irbfetch_bulletins::Config::default();
        Self {
            listing_url: defaults.listing_url,
            site_origin: defaults.site_origin,
            max_pages: defaults.max_pages,
            page_delay_ms: defaults.page_delay.as_millis() as u64,
            chunk_size: defaults.chunk_size,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub default: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            default: irbfetch_bulletins::Config::default().workers,
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./irbfetch.toml (current directory)
    /// 2. ~/.config/irbfetch/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("irbfetch.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "irbfetch") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Pipeline configuration described by this file
    pub fn pipeline(&self) -> irbfetch_bulletins::Config {
        irbfetch_bulletins::Config {
            output_dir: self.output.dir.clone(),
            ledger_path: self.output.ledger.clone(),
            listing_url: self.crawl.listing_url.clone(),
            site_origin: self.crawl.site_origin.clone(),
            workers: self.workers.default,
            max_pages: self.crawl.max_pages,
            page_delay: Duration::from_millis(self.crawl.page_delay_ms),
            chunk_size: self.crawl.chunk_size,
            http: HttpConfig {
                timeout: Duration::from_secs(self.http.timeout),
                max_retries: self.http.max_retries,
            },
        }
    }
}
