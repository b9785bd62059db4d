//! HTTP client wrapper for downloading PDFs.
//!
//! This module provides the `HttpClient` struct which handles streaming
//! downloads with proper timeout configuration and error handling.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::error::DownloadError;

/// Connect timeout for every request, in seconds.
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Read timeout for every request, in seconds. Generous because arXiv
/// PDFs can run to tens of megabytes on slow links.
pub const READ_TIMEOUT_SECS: u64 = 300;

/// HTTP client for downloading files with streaming support.
///
/// This client is designed to be created once and reused for multiple
/// downloads, taking advantage of connection pooling. Cloning is cheap.
///
/// # Example
///
/// ```no_run
/// use paperhaul::HttpClient;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let fetched = client
///     .download_to_path(
///         "https://arxiv.org/pdf/1706.03762.pdf",
///         Path::new("./papers/attention.pdf"),
///     )
///     .await?;
/// println!("wrote {} bytes", fetched.bytes_written);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

/// Metadata about a completed download.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    /// Bytes written to disk.
    pub bytes_written: u64,
    /// The response Content-Type header, when present.
    pub content_type: Option<String>,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes (for large files)
    /// - Gzip decompression: enabled
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Downloads a URL to the given file path, streaming the body to disk.
    ///
    /// Only a `200 OK` response is accepted; any other status is a
    /// `BadStatus` error. The Content-Type header is recorded but never
    /// rejects a response. On a streaming failure the partial file is
    /// removed before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is invalid
    /// - The request fails (network error, timeout)
    /// - The server returns a status other than 200
    /// - Writing to disk fails
    #[must_use = "fetch result reports the bytes actually written"]
    #[instrument(skip(self), fields(url = %url, path = %path.display()))]
    pub async fn download_to_path(
        &self,
        url: &str,
        path: &Path,
    ) -> Result<FetchedFile, DownloadError> {
        debug!("starting download");

        // Validate URL before dispatching
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(DownloadError::bad_status(url, status));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(std::string::ToString::to_string);
        debug!(content_type = content_type.as_deref().unwrap_or("<none>"), "response headers");

        let mut file = File::create(path)
            .await
            .map_err(|e| DownloadError::io(path.to_path_buf(), e))?;

        // Stream response body to file, with cleanup on error
        let stream_result = stream_to_file(&mut file, response, url, path).await;
        if stream_result.is_err() {
            debug!(path = %path.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(path).await;
        }
        let bytes_written = stream_result?;

        debug!(bytes = bytes_written, "download complete");

        Ok(FetchedFile {
            bytes_written,
            content_type,
        })
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Streams response body to file, returning bytes written.
///
/// This is extracted to enable cleanup on error in the caller.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
    }

    // Ensure all data is flushed to disk
    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}
