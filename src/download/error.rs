//! Error types for the download module.
//!
//! This module defines structured errors for all download operations,
//! providing context-rich error messages for debugging and user feedback.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while downloading a single PDF.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP response with a status other than 200 OK.
    #[error("HTTP {status} downloading {url}")]
    BadStatus {
        /// The URL that returned an unexpected status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Downloaded file is below the minimum plausible PDF size.
    #[error("undersized file at {path}: {bytes} bytes (floor {floor})")]
    Undersized {
        /// Path of the rejected file (removed before this error is returned).
        path: PathBuf,
        /// Actual size in bytes.
        bytes: u64,
        /// Minimum acceptable size in bytes.
        floor: u64,
    },

    /// File system error during download (create file, write, etc.)
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The batch was cancelled before this job could complete.
    #[error("download cancelled: {url}")]
    Cancelled {
        /// The URL whose download was abandoned.
        url: String,
    },
}

/// Coarse failure classification carried in batch outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network or timeout failure.
    Network,
    /// Non-200 HTTP response.
    BadStatus,
    /// File written but below the size floor.
    Undersized,
    /// Local filesystem failure.
    Filesystem,
    /// Job abandoned due to cancellation.
    Cancelled,
    /// Anything else (invalid URL, task panic).
    Other,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Network => "network",
            Self::BadStatus => "bad status",
            Self::Undersized => "undersized",
            Self::Filesystem => "filesystem",
            Self::Cancelled => "cancelled",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a bad-status error.
    pub fn bad_status(url: impl Into<String>, status: u16) -> Self {
        Self::BadStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an undersized-file error.
    pub fn undersized(path: impl Into<PathBuf>, bytes: u64, floor: u64) -> Self {
        Self::Undersized {
            path: path.into(),
            bytes,
            floor,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Classifies this error for batch outcome reporting.
    ///
    /// Timeouts count as network failures; an invalid URL has no
    /// dedicated bucket and reports as `Other`.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => FailureKind::Network,
            Self::BadStatus { .. } => FailureKind::BadStatus,
            Self::Undersized { .. } => FailureKind::Undersized,
            Self::Io { .. } => FailureKind::Filesystem,
            Self::Cancelled { .. } => FailureKind::Cancelled,
            Self::InvalidUrl { .. } => FailureKind::Other,
        }
    }
}

// Note on From trait implementations:
// We intentionally do NOT implement `From<reqwest::Error>` or `From<std::io::Error>`
// because our error variants require context (url, path) that the source errors
// don't provide. The helper constructor methods (network(), io(), etc.) are the
// correct pattern here as they allow callers to provide necessary context.
