//! Filename sanitization and path naming for downloaded papers.
//!
//! This module derives safe, deterministic file and folder names from
//! paper titles, arXiv identifiers, and the originating search query.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::paper::PaperRecord;

/// Sanitizes a title, query, or identifier into a filesystem-safe component.
///
/// Alphanumerics, `-`, `_`, `.`, and spaces pass through; every other
/// character becomes `_`. Leading and trailing separators are stripped so
/// names never start or end with `_`, `.`, or whitespace.
#[must_use]
pub fn sanitize(value: &str) -> String {
    let mapped: String = value
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    mapped
        .trim_matches(|c: char| c == '_' || c == '.' || c.is_whitespace())
        .to_string()
}

/// Returns the default PDF file name for a record: `<sanitize(title)>.pdf`.
/// A title that sanitizes to nothing falls back to the identifier, so a
/// valid record never yields the hidden name `.pdf`.
#[must_use]
pub fn pdf_file_name(record: &PaperRecord) -> String {
    let stem = sanitize(&record.title);
    if stem.is_empty() {
        format!("{}.pdf", sanitize(&record.arxiv_id))
    } else {
        format!("{stem}.pdf")
    }
}

/// Returns the collision-avoiding PDF file name:
/// `<sanitize(title)>_<sanitize(id)>.pdf`, or just the identifier when
/// the title sanitizes to nothing.
#[must_use]
pub fn pdf_file_name_with_id(record: &PaperRecord) -> String {
    let stem = sanitize(&record.title);
    let id = sanitize(&record.arxiv_id);
    if stem.is_empty() {
        format!("{id}.pdf")
    } else {
        format!("{stem}_{id}.pdf")
    }
}

/// Returns the batch folder name for a query on a given date:
/// `<sanitize(query)>_<YYYY-MM-DD>`.
#[must_use]
pub fn batch_folder_name(query: &str, date: NaiveDate) -> String {
    format!("{}_{}", sanitize(query), date.format("%Y-%m-%d"))
}

/// Assigns a unique file name to every record in a batch.
///
/// Each record gets `<title>.pdf`; when two records in the same batch
/// sanitize to the same name the arXiv identifier is appended, and a
/// numeric suffix resolves the (pathological) remaining collisions.
/// Names are decided up front so concurrent workers never race on the
/// filesystem.
#[must_use]
pub fn assign_file_names(records: &[PaperRecord]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(records.len());
    records
        .iter()
        .map(|record| {
            let plain = pdf_file_name(record);
            if taken.insert(plain.clone()) {
                return plain;
            }
            let with_id = pdf_file_name_with_id(record);
            if taken.insert(with_id.clone()) {
                return with_id;
            }
            let stem = with_id.trim_end_matches(".pdf").to_string();
            for i in 2.. {
                let candidate = format!("{stem}_{i}.pdf");
                if taken.insert(candidate.clone()) {
                    return candidate;
                }
            }
            unreachable!("suffix search always terminates")
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(id: &str, title: &str) -> PaperRecord {
        PaperRecord {
            title: title.to_string(),
            authors: vec![],
            published: "2017-06-12".to_string(),
            summary: String::new(),
            arxiv_id: id.to_string(),
            pdf_url: None,
            category: None,
        }
    }

    #[test]
    fn test_sanitize_preserves_allowed_chars() {
        assert_eq!(
            sanitize("Attention Is All You Need"),
            "Attention Is All You Need"
        );
        assert_eq!(sanitize("v2.0_final-draft"), "v2.0_final-draft");
    }

    #[test]
    fn test_sanitize_replaces_invalid_chars() {
        assert_eq!(sanitize("GANs: a survey?"), "GANs_ a survey");
        assert_eq!(sanitize("a/b\\c"), "a_b_c");
    }

    #[test]
    fn test_sanitize_strips_leading_and_trailing_separators() {
        assert_eq!(sanitize("...title..."), "title");
        assert_eq!(sanitize("  spaced  "), "spaced");
        assert_eq!(sanitize("__x__"), "x");
    }

    #[test]
    fn test_sanitize_empty_input() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("???"), "");
    }

    #[test]
    fn test_pdf_file_name_from_title() {
        let rec = record("1706.03762", "Attention Is All You Need");
        assert_eq!(pdf_file_name(&rec), "Attention Is All You Need.pdf");
    }

    #[test]
    fn test_pdf_file_name_unsanitizable_title_falls_back_to_id() {
        let rec = record("2401.00001", "???");
        assert_eq!(pdf_file_name(&rec), "2401.00001.pdf");
        assert_eq!(pdf_file_name_with_id(&rec), "2401.00001.pdf");
    }

    #[test]
    fn test_pdf_file_name_with_id_appends_identifier() {
        let rec = record("1706.03762", "Attention Is All You Need");
        assert_eq!(
            pdf_file_name_with_id(&rec),
            "Attention Is All You Need_1706.03762.pdf"
        );
    }

    #[test]
    fn test_batch_folder_name_combines_query_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            batch_folder_name("large language models?", date),
            "large language models_2024-03-09"
        );
    }

    #[test]
    fn test_assign_file_names_no_collision() {
        let records = vec![record("1706.03762", "Attention"), record("1810.04805", "BERT")];
        assert_eq!(
            assign_file_names(&records),
            vec!["Attention.pdf", "BERT.pdf"]
        );
    }

    #[test]
    fn test_assign_file_names_collision_gets_id_suffix() {
        let records = vec![
            record("1706.03762", "Survey"),
            record("1810.04805", "Survey"),
        ];
        assert_eq!(
            assign_file_names(&records),
            vec!["Survey.pdf", "Survey_1810.04805.pdf"]
        );
    }

    #[test]
    fn test_assign_file_names_all_unique() {
        let records: Vec<PaperRecord> = (0..20)
            .map(|i| record(&format!("2101.{i:05}"), "Same Title"))
            .collect();
        let names = assign_file_names(&records);
        let distinct: HashSet<&String> = names.iter().collect();
        assert_eq!(distinct.len(), records.len(), "All names must be unique");
    }
}
