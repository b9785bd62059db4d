//! Download engine for concurrent PDF downloads with retry support.
//!
//! This module provides the `DownloadEngine` which coordinates concurrent
//! downloads using a semaphore-based concurrency control pattern, with a
//! fixed-delay retry loop, a size floor for corruption detection, and
//! progress snapshots published on a watch channel.
//!
//! # Example
//!
//! ```no_run
//! use paperhaul::{CancelToken, DownloadEngine, HttpClient, RetryPolicy};
//! use std::path::Path;
//!
//! # async fn example(records: Vec<paperhaul::PaperRecord>) -> Result<(), Box<dyn std::error::Error>> {
//! let engine = DownloadEngine::new(5, RetryPolicy::default(), HttpClient::new())?;
//! let cancel = CancelToken::new();
//! let batch = engine
//!     .download_batch(&records, "transformers", Path::new("./papers"), &cancel)
//!     .await?;
//! println!("{} of {} downloaded", batch.succeeded(), batch.attempted());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Local;
use tokio::sync::{Semaphore, watch};
use tracing::{debug, info, instrument, warn};

use super::client::{FetchedFile, HttpClient};
use super::error::{DownloadError, FailureKind};
use super::filename::{assign_file_names, batch_folder_name, pdf_file_name, pdf_file_name_with_id};
use super::progress::BatchProgress;
use crate::citation;
use crate::paper::{PaperRecord, dedup_by_id};

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 64;

/// Default concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default number of attempts per job.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between attempts.
pub const DEFAULT_RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Size floor for downloaded PDFs. Anything smaller is treated as a
/// corrupt or error-page response and deleted.
pub const MIN_PDF_BYTES: u64 = 10 * 1024;

/// Retry policy: bounded attempts with a fixed pause between them.
///
/// Every failure except cancellation is retried; the failure reason does
/// not change the pacing.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            pause: DEFAULT_RETRY_PAUSE,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with explicit attempt count and pause.
    /// An attempt count of zero is coerced to one.
    #[must_use]
    pub fn new(max_attempts: u32, pause: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            pause,
        }
    }

    /// Maximum number of attempts per job.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause between attempts.
    #[must_use]
    pub fn pause(&self) -> Duration {
        self.pause
    }
}

/// Cooperative cancellation handle shared between the caller and all
/// in-flight download jobs.
///
/// Cancellation is checked before every attempt: jobs already streaming
/// a response finish that attempt, jobs not yet started resolve to a
/// `Cancelled` failure.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of the batch sharing this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// True once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Error type for download engine operations.
///
/// Per-job failures never surface here; they become `Failure` outcomes.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The batch folder could not be created. Raised before any job is
    /// dispatched.
    #[error("failed to create download folder {path}: {source}")]
    Folder {
        /// The folder that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// Terminal state of one download job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The PDF is on disk under the batch folder.
    Success {
        /// File name within the batch folder.
        file_name: String,
    },
    /// All attempts failed; nothing remains on disk for this job.
    Failure {
        /// Coarse failure classification.
        kind: FailureKind,
        /// Final error message, for reporting.
        message: String,
    },
}

/// One per selected record, pairing the paper with its outcome.
#[derive(Debug, Clone)]
pub struct JobResult {
    /// arXiv identifier of the paper.
    pub arxiv_id: String,
    /// Title of the paper.
    pub title: String,
    /// How the job ended.
    pub outcome: JobOutcome,
}

impl JobResult {
    /// True when the job produced a file.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Success { .. })
    }
}

/// Summary of a completed batch.
#[derive(Debug)]
pub struct DownloadBatch {
    /// Folder holding the downloaded files and the citation file.
    pub folder: PathBuf,
    /// One result per selected record, in submission order.
    pub outcomes: Vec<JobResult>,
    /// Path of the generated citation file, when persistence succeeded.
    pub citation_file: Option<PathBuf>,
}

impl DownloadBatch {
    /// Number of jobs attempted (one per deduplicated record).
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of jobs that produced a file.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|r| r.is_success()).count()
    }
}

/// Download engine for concurrent PDF downloads with retry support.
///
/// # Concurrency Model
///
/// - Each download runs in its own Tokio task
/// - A semaphore permit is acquired before spawning each task
/// - Permits are released automatically when tasks complete (RAII)
///
/// # Retry Behavior
///
/// - Every failure except cancellation is retried up to the policy's
///   attempt count, with a fixed pause between attempts
/// - Undersized files are deleted before the retry
/// - Per-job failures are isolated: one bad URL never aborts the batch
#[derive(Debug)]
pub struct DownloadEngine {
    /// HTTP client shared by all jobs.
    client: HttpClient,
    /// Semaphore for concurrency control.
    semaphore: Arc<Semaphore>,
    /// Configured concurrency limit.
    concurrency: usize,
    /// Retry policy for failed downloads.
    policy: RetryPolicy,
    /// Name of the citation file written into each batch folder.
    citation_file_name: String,
    /// Whether single-paper downloads also emit a citation file.
    cite_single_downloads: bool,
    /// Progress publisher; receivers come from [`subscribe`](Self::subscribe).
    progress: watch::Sender<BatchProgress>,
}

impl DownloadEngine {
    /// Creates a new download engine.
    ///
    /// # Arguments
    ///
    /// * `concurrency` - Maximum number of concurrent downloads (1-64)
    /// * `policy` - Retry policy applied to every job
    /// * `client` - HTTP client shared by all jobs
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-64).
    #[instrument(level = "debug", skip(policy, client))]
    pub fn new(
        concurrency: usize,
        policy: RetryPolicy,
        client: HttpClient,
    ) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }

        debug!(
            concurrency,
            max_attempts = policy.max_attempts(),
            pause_ms = policy.pause().as_millis(),
            "creating download engine"
        );

        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            policy,
            citation_file_name: citation::DEFAULT_CITATION_FILE.to_string(),
            cite_single_downloads: true,
            progress: watch::Sender::new(BatchProgress::default()),
        })
    }

    /// Overrides the citation file name written into batch folders.
    #[must_use]
    pub fn with_citation_file_name(mut self, name: impl Into<String>) -> Self {
        self.citation_file_name = name.into();
        self
    }

    /// Controls whether single-paper downloads emit a citation file.
    #[must_use]
    pub fn with_cite_single_downloads(mut self, enabled: bool) -> Self {
        self.cite_single_downloads = enabled;
        self
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns a receiver for batch progress snapshots.
    ///
    /// A fresh snapshot is published after every job completion; the
    /// default value (`total == 0`) marks the end of a batch.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BatchProgress> {
        self.progress.subscribe()
    }

    /// Downloads every record concurrently into a dated batch folder.
    ///
    /// Records are deduplicated by arXiv identifier first. The batch
    /// folder is `<download_root>/<sanitize(query)>_<YYYY-MM-DD>`; file
    /// names are assigned up front so within-batch title collisions get
    /// an identifier suffix. After all jobs finish a citation file
    /// covering the FULL record list is written into the folder.
    ///
    /// Outcomes are returned in submission order regardless of the order
    /// jobs actually finish in.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Folder`] if the batch folder cannot be
    /// created (before any job is dispatched), or
    /// [`EngineError::SemaphoreClosed`] if the semaphore is closed.
    /// Individual download failures do NOT cause this method to error.
    #[instrument(skip(self, records, cancel), fields(query = %query, count = records.len()))]
    pub async fn download_batch(
        &self,
        records: &[PaperRecord],
        query: &str,
        download_root: &Path,
        cancel: &CancelToken,
    ) -> Result<DownloadBatch, EngineError> {
        let records = dedup_by_id(records.to_vec());
        let folder = download_root.join(batch_folder_name(query, Local::now().date_naive()));

        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|e| EngineError::Folder {
                path: folder.clone(),
                source: e,
            })?;

        let file_names = assign_file_names(&records);
        let total = records.len();
        let completed = Arc::new(AtomicUsize::new(0));
        let succeeded = Arc::new(AtomicUsize::new(0));

        info!(total, folder = %folder.display(), "starting batch download");
        self.progress.send_replace(BatchProgress {
            completed: 0,
            succeeded: 0,
            total,
        });

        let mut handles = Vec::with_capacity(total);
        for (record, file_name) in records.iter().zip(&file_names) {
            // Acquire semaphore permit (blocks if at concurrency limit)
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| EngineError::SemaphoreClosed)?;

            // Clone values for the spawned task
            let client = self.client.clone();
            let policy = self.policy.clone();
            let record = record.clone();
            let file_name = file_name.clone();
            let path = folder.join(&file_name);
            let cancel = cancel.clone();
            let completed = Arc::clone(&completed);
            let succeeded = Arc::clone(&succeeded);
            let progress = self.progress.clone();

            handles.push(tokio::spawn(async move {
                // Permit is dropped when this block exits (RAII)
                let _permit = permit;

                let url = record.resolved_pdf_url();
                let outcome = match download_job(&client, &url, &path, &policy, &cancel).await {
                    Ok(fetched) => {
                        info!(
                            arxiv_id = %record.arxiv_id,
                            bytes = fetched.bytes_written,
                            file = %file_name,
                            "download completed"
                        );
                        succeeded.fetch_add(1, Ordering::SeqCst);
                        JobOutcome::Success { file_name }
                    }
                    Err(e) => {
                        warn!(arxiv_id = %record.arxiv_id, url = %url, error = %e, "download failed");
                        JobOutcome::Failure {
                            kind: e.kind(),
                            message: e.to_string(),
                        }
                    }
                };

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                progress.send_replace(BatchProgress {
                    completed: done,
                    succeeded: succeeded.load(Ordering::SeqCst),
                    total,
                });

                JobResult {
                    arxiv_id: record.arxiv_id,
                    title: record.title,
                    outcome,
                }
            }));
        }

        // Reassemble outcomes in submission order; a panicked task becomes
        // a Failure outcome rather than aborting the batch.
        let mut outcomes = Vec::with_capacity(total);
        for (idx, handle) in handles.into_iter().enumerate() {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "download task panicked");
                    JobResult {
                        arxiv_id: records[idx].arxiv_id.clone(),
                        title: records[idx].title.clone(),
                        outcome: JobOutcome::Failure {
                            kind: FailureKind::Other,
                            message: "download task panicked".to_string(),
                        },
                    }
                }
            };
            outcomes.push(result);
        }

        // Citation covers the full record list, failed downloads included,
        // so the user keeps references for papers they can fetch by hand.
        let citation_file = self.write_citation(&records, &folder).await;

        let batch = DownloadBatch {
            folder,
            outcomes,
            citation_file,
        };
        info!(
            succeeded = batch.succeeded(),
            attempted = batch.attempted(),
            "batch download complete"
        );

        // Mark the batch as finished for progress consumers.
        self.progress.send_replace(BatchProgress::default());

        Ok(batch)
    }

    /// Downloads a single record into `folder`.
    ///
    /// The folder is created if missing. If the default file name already
    /// exists on disk the identifier-suffixed name is used instead. A
    /// one-entry citation file is written on success unless disabled via
    /// [`with_cite_single_downloads`](Self::with_cite_single_downloads).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Folder`] if the folder cannot be created.
    /// Download failures are reported through the returned `JobResult`.
    #[instrument(skip(self, record, cancel), fields(arxiv_id = %record.arxiv_id))]
    pub async fn download_one(
        &self,
        record: &PaperRecord,
        folder: &Path,
        cancel: &CancelToken,
    ) -> Result<JobResult, EngineError> {
        tokio::fs::create_dir_all(folder)
            .await
            .map_err(|e| EngineError::Folder {
                path: folder.to_path_buf(),
                source: e,
            })?;

        let mut file_name = pdf_file_name(record);
        if folder.join(&file_name).exists() {
            file_name = pdf_file_name_with_id(record);
        }
        let path = folder.join(&file_name);

        let url = record.resolved_pdf_url();
        let outcome = match download_job(&self.client, &url, &path, &self.policy, cancel).await {
            Ok(fetched) => {
                info!(bytes = fetched.bytes_written, file = %file_name, "download completed");
                if self.cite_single_downloads {
                    self.write_citation(std::slice::from_ref(record), folder)
                        .await;
                }
                JobOutcome::Success { file_name }
            }
            Err(e) => {
                warn!(url = %url, error = %e, "download failed");
                JobOutcome::Failure {
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        };

        Ok(JobResult {
            arxiv_id: record.arxiv_id.clone(),
            title: record.title.clone(),
            outcome,
        })
    }

    /// Generates and persists the citation file, best-effort.
    async fn write_citation(&self, records: &[PaperRecord], folder: &Path) -> Option<PathBuf> {
        let content = citation::generate(records);
        match citation::persist(&content, folder, &self.citation_file_name).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "failed to write citation file");
                None
            }
        }
    }
}

/// Runs the retry loop for one download job.
///
/// Cancellation is checked before every attempt. A successful response
/// below the size floor is deleted and counts as a failed attempt.
async fn download_job(
    client: &HttpClient,
    url: &str,
    path: &Path,
    policy: &RetryPolicy,
    cancel: &CancelToken,
) -> Result<FetchedFile, DownloadError> {
    let mut attempt = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Err(DownloadError::cancelled(url));
        }

        attempt += 1;
        debug!(attempt, url = %url, "attempting download");

        let error = match client.download_to_path(url, path).await {
            Ok(fetched) if fetched.bytes_written >= MIN_PDF_BYTES => return Ok(fetched),
            Ok(fetched) => {
                // Too small to be a real PDF. Delete before retrying.
                let _ = tokio::fs::remove_file(path).await;
                DownloadError::undersized(path, fetched.bytes_written, MIN_PDF_BYTES)
            }
            Err(e) => e,
        };

        if attempt >= policy.max_attempts() {
            return Err(error);
        }

        debug!(
            attempt,
            max_attempts = policy.max_attempts(),
            pause_ms = policy.pause().as_millis(),
            error = %error,
            "retrying download"
        );
        tokio::time::sleep(policy.pause()).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_rejects_zero_concurrency() {
        let result = DownloadEngine::new(0, RetryPolicy::default(), HttpClient::new());
        assert!(matches!(
            result,
            Err(EngineError::InvalidConcurrency { value: 0 })
        ));
    }

    #[test]
    fn test_engine_rejects_excessive_concurrency() {
        let result = DownloadEngine::new(65, RetryPolicy::default(), HttpClient::new());
        assert!(matches!(
            result,
            Err(EngineError::InvalidConcurrency { value: 65 })
        ));
    }

    #[test]
    fn test_engine_accepts_bounds() {
        assert!(DownloadEngine::new(1, RetryPolicy::default(), HttpClient::new()).is_ok());
        assert!(DownloadEngine::new(64, RetryPolicy::default(), HttpClient::new()).is_ok());
    }

    #[test]
    fn test_retry_policy_coerces_zero_attempts() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_cancel_token_flips_once() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());

        let clone = token.clone();
        assert!(clone.is_cancelled(), "Clones share the cancellation flag");
    }

    #[test]
    fn test_download_batch_counts() {
        let batch = DownloadBatch {
            folder: PathBuf::from("/tmp/x"),
            outcomes: vec![
                JobResult {
                    arxiv_id: "1".to_string(),
                    title: "a".to_string(),
                    outcome: JobOutcome::Success {
                        file_name: "a.pdf".to_string(),
                    },
                },
                JobResult {
                    arxiv_id: "2".to_string(),
                    title: "b".to_string(),
                    outcome: JobOutcome::Failure {
                        kind: FailureKind::Network,
                        message: "boom".to_string(),
                    },
                },
            ],
            citation_file: None,
        };
        assert_eq!(batch.attempted(), 2);
        assert_eq!(batch.succeeded(), 1);
    }
}
