//! Paper metadata records.
//!
//! `PaperRecord` is the unit of data flowing through the whole pipeline:
//! the fetcher produces them, the cache serializes them, the download
//! engine consumes them, and the citation generator formats them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when constructing an invalid record.
#[derive(Debug, Error)]
pub enum PaperError {
    /// The arXiv identifier is missing or empty.
    #[error("paper record has no arXiv identifier (title: {title:?})")]
    MissingId {
        /// Title of the offending record, for diagnostics.
        title: String,
    },

    /// The title is missing or empty.
    #[error("paper record {arxiv_id} has no title")]
    MissingTitle {
        /// Identifier of the offending record.
        arxiv_id: String,
    },
}

/// Metadata for a single arXiv paper.
///
/// Serializable so result sets round-trip through the SQLite cache as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Paper title (non-empty).
    pub title: String,
    /// Author names in feed order.
    pub authors: Vec<String>,
    /// Publication date as an ISO `YYYY-MM-DD` string.
    pub published: String,
    /// Abstract text.
    pub summary: String,
    /// arXiv identifier without version suffix (non-empty), e.g. `1706.03762`.
    pub arxiv_id: String,
    /// Explicit PDF URL from the feed, when present.
    pub pdf_url: Option<String>,
    /// Primary category, e.g. `cs.CL`.
    pub category: Option<String>,
}

impl PaperRecord {
    /// Validates the record invariants: non-empty identifier and title.
    ///
    /// # Errors
    ///
    /// Returns `PaperError::MissingId` or `PaperError::MissingTitle`.
    pub fn validate(&self) -> Result<(), PaperError> {
        if self.arxiv_id.trim().is_empty() {
            return Err(PaperError::MissingId {
                title: self.title.clone(),
            });
        }
        if self.title.trim().is_empty() {
            return Err(PaperError::MissingTitle {
                arxiv_id: self.arxiv_id.clone(),
            });
        }
        Ok(())
    }

    /// Returns the PDF URL, deriving the canonical arXiv form when the
    /// feed did not supply one explicitly.
    #[must_use]
    pub fn resolved_pdf_url(&self) -> String {
        self.pdf_url
            .clone()
            .unwrap_or_else(|| format!("https://arxiv.org/pdf/{}.pdf", self.arxiv_id))
    }

    /// Returns the abstract page URL for this paper.
    #[must_use]
    pub fn abs_url(&self) -> String {
        format!("https://arxiv.org/abs/{}", self.arxiv_id)
    }

    /// Extracts the four-digit publication year, if the published date
    /// starts with one.
    #[must_use]
    pub fn year(&self) -> Option<&str> {
        let candidate = self.published.get(..4)?;
        candidate
            .chars()
            .all(|c| c.is_ascii_digit())
            .then_some(candidate)
    }
}

/// Removes duplicate records, keeping the first occurrence of each
/// arXiv identifier. Order is otherwise preserved.
#[must_use]
pub fn dedup_by_id(records: Vec<PaperRecord>) -> Vec<PaperRecord> {
    let mut seen = std::collections::HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.arxiv_id.clone()))
        .collect()
}
