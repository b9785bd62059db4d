//! Paperhaul core library
//!
//! This library backs the `paperhaul` tool, which searches arXiv, bulk-downloads
//! paper PDFs with bounded concurrency and per-item retry, and generates BibTeX
//! citation files alongside the downloaded papers.
//!
//! # Architecture
//!
//! - [`fetch`] - arXiv metadata fetcher (Atom API client and feed parser)
//! - [`cache`] - query-level result cache backed by SQLite
//! - [`download`] - concurrent PDF download engine (the core subsystem)
//! - [`citation`] - BibTeX generation and persistence
//! - [`interactions`] - user action and search history sink
//! - [`session`] - request-scoped search context (query, page, selection)
//! - [`db`] - database connection and schema management
//! - [`config`] - injected application configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod citation;
pub mod config;
pub mod db;
pub mod download;
pub mod fetch;
pub mod interactions;
pub mod paper;
pub mod session;

// Re-export commonly used types
pub use cache::{CacheError, ResultsCache};
pub use config::{AppConfig, ConfigError};
pub use db::Database;
pub use download::{
    BatchProgress, CancelToken, DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, DownloadBatch,
    DownloadEngine, DownloadError, EngineError, FailureKind, HttpClient, JobOutcome, JobResult,
    MIN_PDF_BYTES, RetryPolicy, sanitize,
};
pub use fetch::{ArxivClient, FetchError, SearchRequest};
pub use interactions::{ActionKind, HistoryError, InteractionLog};
pub use paper::PaperRecord;
pub use session::SearchSession;
