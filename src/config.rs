//! Application configuration.
//!
//! All knobs live in an `AppConfig` loaded from an optional JSON file;
//! every field has a default so an empty or missing file still yields a
//! working configuration. The download root is injected here rather
//! than hardcoded anywhere.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::citation::DEFAULT_CITATION_FILE;
use crate::download::{DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, RetryPolicy};
use crate::session::DEFAULT_PAGE_SIZE;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path of the config file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path of the config file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Application configuration with defaults for every field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root folder for downloads; batch folders are created beneath it.
    pub download_root: PathBuf,
    /// Path of the SQLite database file.
    pub db_path: PathBuf,
    /// Concurrent download width (1-64).
    pub concurrency: usize,
    /// Attempts per download job.
    pub max_attempts: u32,
    /// Pause between attempts, in milliseconds.
    pub retry_pause_ms: u64,
    /// HTTP connect timeout, in seconds.
    pub connect_timeout_secs: u64,
    /// HTTP read timeout, in seconds.
    pub read_timeout_secs: u64,
    /// Name of the citation file written into batch folders.
    pub citation_file_name: String,
    /// Whether single-paper downloads emit a citation file too.
    pub cite_single_downloads: bool,
    /// Records shown per page in search output.
    pub page_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            download_root: PathBuf::from("./papers"),
            db_path: PathBuf::from("./paperhaul.db"),
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_pause_ms: 1000,
            connect_timeout_secs: crate::download::CONNECT_TIMEOUT_SECS,
            read_timeout_secs: crate::download::READ_TIMEOUT_SECS,
            citation_file_name: DEFAULT_CITATION_FILE.to_string(),
            cite_single_downloads: true,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl AppConfig {
    /// Loads configuration from an optional JSON file.
    ///
    /// `None` yields the defaults. Fields absent from the file keep
    /// their default values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, or
    /// `ConfigError::Parse` if it is not valid JSON.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            debug!("no config file, using defaults");
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// The retry policy implied by this configuration.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.retry_pause_ms))
    }
}
