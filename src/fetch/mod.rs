//! arXiv metadata fetcher.
//!
//! Queries the arXiv Atom API and normalizes entries into
//! [`PaperRecord`]s, applying the category filter and publication-date
//! window from the request.

mod atom;

pub use atom::{extract_arxiv_id, parse_feed};

use std::time::Duration;

use chrono::{Local, NaiveDate};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::paper::{PaperRecord, dedup_by_id};

/// Public arXiv API endpoint.
pub const DEFAULT_BASE_URL: &str = "http://export.arxiv.org/api/query";

/// Request timeout for metadata queries. Feeds are small; this is much
/// tighter than the PDF download timeout.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// Default number of results requested from the API.
pub const DEFAULT_MAX_RESULTS: u32 = 100;

/// Errors raised by metadata fetches.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure reaching the API.
    #[error("network error querying arXiv: {0}")]
    Network(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("arXiv API returned HTTP {status}")]
    BadStatus {
        /// The HTTP status code.
        status: u16,
    },
}

/// Parameters for one search against the arXiv API.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Free-text query.
    pub query: String,
    /// Inclusive lower bound on the publication date.
    pub from_date: Option<NaiveDate>,
    /// Inclusive upper bound on the publication date. Values in the
    /// future are clamped to today.
    pub to_date: Option<NaiveDate>,
    /// arXiv category filter, e.g. `cs.CL`.
    pub category: Option<String>,
    /// Maximum number of results requested from the API.
    pub max_results: u32,
}

impl SearchRequest {
    /// Creates a request with just a query; all filters off.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            from_date: None,
            to_date: None,
            category: None,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// The search expression sent to the API: the query text, with the
    /// category appended as `AND cat:<category>` when set.
    #[must_use]
    pub fn search_expression(&self) -> String {
        match &self.category {
            Some(cat) if !cat.trim().is_empty() => format!("{} AND cat:{cat}", self.query),
            _ => self.query.clone(),
        }
    }

    /// The effective date window, with `to_date` clamped to `today`.
    /// Returns `None` when no bound is set.
    #[must_use]
    pub fn date_window(&self, today: NaiveDate) -> Option<(Option<NaiveDate>, NaiveDate)> {
        if self.from_date.is_none() && self.to_date.is_none() {
            return None;
        }
        let upper = self.to_date.map_or(today, |d| d.min(today));
        Some((self.from_date, upper))
    }
}

/// Client for the arXiv Atom API.
#[derive(Debug, Clone)]
pub struct ArxivClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for ArxivClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ArxivClient {
    /// Creates a client against the public arXiv endpoint.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(QUERY_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Points the client at a different endpoint. Used by tests against
    /// a mock server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Runs a search and returns matching records, newest first.
    ///
    /// Results are filtered to the request's publication-date window
    /// (entries whose date cannot be parsed are dropped only when a
    /// window is set) and deduplicated by arXiv identifier.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Network` on transport failure or
    /// `FetchError::BadStatus` on a non-success response.
    #[instrument(skip(self), fields(query = %request.query))]
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<PaperRecord>, FetchError> {
        let expression = request.search_expression();
        debug!(expression = %expression, max_results = request.max_results, "querying arXiv");

        let max_results = request.max_results.to_string();
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("search_query", expression.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let records = parse_feed(&body);
        debug!(parsed = records.len(), "feed parsed");

        let today = Local::now().date_naive();
        let filtered = match request.date_window(today) {
            Some((lower, upper)) => records
                .into_iter()
                .filter(|r| in_window(r, lower, upper))
                .collect(),
            None => records,
        };

        let deduped = dedup_by_id(filtered);
        info!(count = deduped.len(), "search complete");
        Ok(deduped)
    }
}

/// True when the record's publication date parses and falls inside the
/// window.
fn in_window(record: &PaperRecord, lower: Option<NaiveDate>, upper: NaiveDate) -> bool {
    let Ok(date) = NaiveDate::parse_from_str(&record.published, "%Y-%m-%d") else {
        return false;
    };
    if let Some(lower) = lower
        && date < lower
    {
        return false;
    }
    date <= upper
}
