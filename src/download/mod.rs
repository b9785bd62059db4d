//! Concurrent PDF download subsystem.
//!
//! The [`DownloadEngine`] coordinates batches of downloads with bounded
//! concurrency, fixed-delay retries, a size floor for corruption
//! detection, cooperative cancellation, and live progress snapshots.

mod client;
mod engine;
mod error;
mod filename;
mod progress;

pub use client::{CONNECT_TIMEOUT_SECS, FetchedFile, HttpClient, READ_TIMEOUT_SECS};
pub use engine::{
    CancelToken, DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_PAUSE, DownloadBatch,
    DownloadEngine, EngineError, JobOutcome, JobResult, MIN_PDF_BYTES, RetryPolicy,
};
pub use error::{DownloadError, FailureKind};
pub use filename::{
    assign_file_names, batch_folder_name, pdf_file_name, pdf_file_name_with_id, sanitize,
};
pub use progress::BatchProgress;
