//! Request-scoped search context.
//!
//! A `SearchSession` holds the current query, result set, page cursor,
//! and selection. It is plain presentation-layer state: the download
//! engine never sees it, and nothing here touches the database.

use std::collections::BTreeSet;

use crate::paper::PaperRecord;

/// Default number of records shown per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One search interaction: query, results, page cursor, and selection.
#[derive(Debug, Clone)]
pub struct SearchSession {
    query: String,
    records: Vec<PaperRecord>,
    page: usize,
    page_size: usize,
    selected: BTreeSet<String>,
}

impl SearchSession {
    /// Creates a session over a result set with the default page size.
    #[must_use]
    pub fn new(query: impl Into<String>, records: Vec<PaperRecord>) -> Self {
        Self::with_page_size(query, records, DEFAULT_PAGE_SIZE)
    }

    /// Creates a session with an explicit page size (coerced to at
    /// least one).
    #[must_use]
    pub fn with_page_size(
        query: impl Into<String>,
        records: Vec<PaperRecord>,
        page_size: usize,
    ) -> Self {
        Self {
            query: query.into(),
            records,
            page: 0,
            page_size: page_size.max(1),
            selected: BTreeSet::new(),
        }
    }

    /// The query this session was created for.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// All records in the result set.
    #[must_use]
    pub fn records(&self) -> &[PaperRecord] {
        &self.records
    }

    /// Zero-based current page index.
    #[must_use]
    pub fn page(&self) -> usize {
        self.page
    }

    /// Records shown per page.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages (at least one, even for an empty result set).
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.records.len().div_ceil(self.page_size).max(1)
    }

    /// The records on the current page.
    #[must_use]
    pub fn page_slice(&self) -> &[PaperRecord] {
        let start = self.page * self.page_size;
        let end = (start + self.page_size).min(self.records.len());
        if start >= self.records.len() {
            &[]
        } else {
            &self.records[start..end]
        }
    }

    /// Moves to a specific page, clamped to the valid range.
    pub fn goto_page(&mut self, page: usize) {
        self.page = page.min(self.total_pages() - 1);
    }

    /// Advances one page, saturating at the last page.
    pub fn next_page(&mut self) {
        self.goto_page(self.page + 1);
    }

    /// Steps back one page, saturating at the first page.
    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    /// Marks a paper as selected. Unknown identifiers are ignored.
    pub fn select(&mut self, arxiv_id: &str) {
        if self.records.iter().any(|r| r.arxiv_id == arxiv_id) {
            self.selected.insert(arxiv_id.to_string());
        }
    }

    /// Toggles a paper's selection state.
    pub fn toggle(&mut self, arxiv_id: &str) {
        if self.selected.contains(arxiv_id) {
            self.selected.remove(arxiv_id);
        } else {
            self.select(arxiv_id);
        }
    }

    /// Selects every record in the result set.
    pub fn select_all(&mut self) {
        self.selected = self
            .records
            .iter()
            .map(|r| r.arxiv_id.clone())
            .collect();
    }

    /// Clears the selection.
    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// True when the paper is currently selected.
    #[must_use]
    pub fn is_selected(&self, arxiv_id: &str) -> bool {
        self.selected.contains(arxiv_id)
    }

    /// Number of selected papers.
    #[must_use]
    pub fn selection_count(&self) -> usize {
        self.selected.len()
    }

    /// The selected records, in result-set order.
    #[must_use]
    pub fn selected_records(&self) -> Vec<PaperRecord> {
        self.records
            .iter()
            .filter(|r| self.selected.contains(&r.arxiv_id))
            .cloned()
            .collect()
    }
}
