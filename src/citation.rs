//! BibTeX citation generation and persistence.
//!
//! Every downloaded batch gets a citation file covering the full record
//! list, failed downloads included. Missing metadata falls back to
//! placeholder values rather than dropping the entry.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};

use crate::download::sanitize;
use crate::paper::PaperRecord;

/// Default citation file name written into batch folders.
pub const DEFAULT_CITATION_FILE: &str = "references.bib";

/// Placeholder author list for records with no authors.
const UNKNOWN_AUTHORS: &str = "Unknown";

/// Placeholder primary category.
const DEFAULT_CATEGORY: &str = "cs.CL";

/// Placeholder abstract text.
const DEFAULT_ABSTRACT: &str = "No abstract available";

/// Placeholder eprint identifier.
const DEFAULT_EPRINT: &str = "XXXX.XXXXX";

/// Errors raised while persisting a citation file.
#[derive(Debug, Error)]
pub enum CitationError {
    /// Writing the citation file failed.
    #[error("failed to write citation file {path}: {source}")]
    Io {
        /// Destination path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Generates a BibTeX document for the given records.
///
/// One `@misc` block per record, blank-line separated, in input order.
/// The cite key is `<sanitized title, spaces as underscores>_<year>`.
/// Output is deterministic for a given input.
#[must_use]
pub fn generate(records: &[PaperRecord]) -> String {
    records
        .iter()
        .map(entry)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn entry(record: &PaperRecord) -> String {
    let year = record.year().unwrap_or("0000");
    let key = format!("{}_{}", sanitize(&record.title).replace(' ', "_"), year);
    let authors = if record.authors.is_empty() {
        UNKNOWN_AUTHORS.to_string()
    } else {
        record.authors.join(" and ")
    };
    let category = record.category.as_deref().unwrap_or(DEFAULT_CATEGORY);
    let summary = if record.summary.trim().is_empty() {
        DEFAULT_ABSTRACT
    } else {
        record.summary.trim()
    };
    let eprint = if record.arxiv_id.trim().is_empty() {
        DEFAULT_EPRINT
    } else {
        record.arxiv_id.as_str()
    };

    format!(
        "@misc{{{key},\n  title = {{{title}}},\n  author = {{{authors}}},\n  year = {{{year}}},\n  eprint = {{{eprint}}},\n  archivePrefix = {{arXiv}},\n  primaryClass = {{{category}}},\n  abstract = {{{summary}}},\n  url = {{{url}}}\n}}",
        title = record.title,
        url = record.abs_url(),
    )
}

/// Writes citation content into `folder` under `file_name`, overwriting
/// any existing file, and returns the written path.
///
/// # Errors
///
/// Returns `CitationError::Io` when the write fails.
#[instrument(skip(content), fields(folder = %folder.display(), file = %file_name))]
pub async fn persist(
    content: &str,
    folder: &Path,
    file_name: &str,
) -> Result<PathBuf, CitationError> {
    let path = folder.join(file_name);
    tokio::fs::write(&path, content)
        .await
        .map_err(|e| CitationError::Io {
            path: path.clone(),
            source: e,
        })?;
    debug!(bytes = content.len(), "citation file written");
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record() -> PaperRecord {
        PaperRecord {
            title: "Attention Is All You Need".to_string(),
            authors: vec![
                "Ashish Vaswani".to_string(),
                "Noam Shazeer".to_string(),
            ],
            published: "2017-06-12".to_string(),
            summary: "The dominant sequence transduction models are based on...".to_string(),
            arxiv_id: "1706.03762".to_string(),
            pdf_url: None,
            category: Some("cs.CL".to_string()),
        }
    }

    #[test]
    fn test_generate_empty_list_is_empty_string() {
        assert_eq!(generate(&[]), "");
    }

    #[test]
    fn test_generate_single_entry_fields() {
        let bib = generate(&[record()]);
        assert!(bib.starts_with("@misc{Attention_Is_All_You_Need_2017,"));
        assert!(bib.contains("title = {Attention Is All You Need}"));
        assert!(bib.contains("author = {Ashish Vaswani and Noam Shazeer}"));
        assert!(bib.contains("year = {2017}"));
        assert!(bib.contains("eprint = {1706.03762}"));
        assert!(bib.contains("primaryClass = {cs.CL}"));
        assert!(bib.contains("url = {https://arxiv.org/abs/1706.03762}"));
    }

    #[test]
    fn test_generate_applies_defaults_for_missing_fields() {
        let mut rec = record();
        rec.authors.clear();
        rec.summary = String::new();
        rec.category = None;
        rec.published = "unknown".to_string();

        let bib = generate(&[rec]);
        assert!(bib.contains("author = {Unknown}"));
        assert!(bib.contains("abstract = {No abstract available}"));
        assert!(bib.contains("primaryClass = {cs.CL}"));
        assert!(bib.contains("year = {0000}"));
    }

    #[test]
    fn test_generate_blank_line_separated_blocks() {
        let mut second = record();
        second.arxiv_id = "1810.04805".to_string();
        second.title = "BERT".to_string();

        let bib = generate(&[record(), second]);
        assert_eq!(bib.matches("@misc{").count(), 2);
        assert!(bib.contains("}\n\n@misc{"), "Blocks must be blank-line separated");
    }

    #[test]
    fn test_generate_is_deterministic() {
        let records = vec![record()];
        assert_eq!(generate(&records), generate(&records));
    }

    #[tokio::test]
    async fn test_persist_writes_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();

        let first = persist("old content", dir.path(), DEFAULT_CITATION_FILE)
            .await
            .unwrap();
        let second = persist("new content", dir.path(), DEFAULT_CITATION_FILE)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(second).unwrap(), "new content");
    }

    #[tokio::test]
    async fn test_persist_missing_folder_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let result = persist("content", &missing, DEFAULT_CITATION_FILE).await;
        assert!(matches!(result, Err(CitationError::Io { .. })));
    }
}
