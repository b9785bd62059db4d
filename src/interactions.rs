//! User action and search history sink.
//!
//! Downloads and selections are recorded per user for later inspection.
//! The `*_best_effort` wrappers log failures and never propagate them, so
//! history writes cannot block or fail the download path.

use sqlx::Row;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::db::Database;

/// Kinds of user actions recorded against a paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// The user downloaded the paper's PDF.
    Download,
    /// The user selected the paper in a result listing.
    Select,
}

impl ActionKind {
    /// Stable string form stored in the database.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Select => "select",
        }
    }
}

/// Errors raised by history writes.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Database write failed.
    #[error("history database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// SQLite-backed interaction and search history log.
#[derive(Debug, Clone)]
pub struct InteractionLog {
    db: Database,
}

impl InteractionLog {
    /// Creates a log over an existing database connection.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Records a user action against a paper.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Database` on write failure.
    #[instrument(skip(self))]
    pub async fn record(
        &self,
        user_id: &str,
        paper_id: &str,
        action: ActionKind,
    ) -> Result<(), HistoryError> {
        sqlx::query("INSERT INTO user_interactions (user_id, paper_id, action) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(paper_id)
            .bind(action.as_str())
            .execute(self.db.pool())
            .await?;
        debug!("interaction recorded");
        Ok(())
    }

    /// Records a search query in the user's history.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Database` on write failure.
    #[instrument(skip(self))]
    pub async fn record_search(&self, user_id: &str, query: &str) -> Result<(), HistoryError> {
        sqlx::query("INSERT INTO search_history (user_id, query) VALUES (?, ?)")
            .bind(user_id)
            .bind(query)
            .execute(self.db.pool())
            .await?;
        debug!("search recorded");
        Ok(())
    }

    /// Returns the user's most recent search queries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Database` on query failure.
    #[instrument(skip(self))]
    pub async fn recent_searches(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<String>, HistoryError> {
        let rows = sqlx::query(
            "SELECT query FROM search_history WHERE user_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter()
            .map(|row| row.try_get::<String, _>("query").map_err(HistoryError::from))
            .collect()
    }

    /// Like [`record`](Self::record), but failures are logged and swallowed.
    pub async fn record_best_effort(&self, user_id: &str, paper_id: &str, action: ActionKind) {
        if let Err(e) = self.record(user_id, paper_id, action).await {
            warn!(user_id, paper_id, error = %e, "failed to record interaction");
        }
    }

    /// Like [`record_search`](Self::record_search), but failures are logged
    /// and swallowed.
    pub async fn record_search_best_effort(&self, user_id: &str, query: &str) {
        if let Err(e) = self.record_search(user_id, query).await {
            warn!(user_id, error = %e, "failed to record search");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn log() -> InteractionLog {
        InteractionLog::new(Database::new_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_record_inserts_row() {
        let log = log().await;
        log.record("alice", "1706.03762", ActionKind::Download)
            .await
            .unwrap();

        let row: (String, String) = sqlx::query_as(
            "SELECT paper_id, action FROM user_interactions WHERE user_id = 'alice'",
        )
        .fetch_one(log.db.pool())
        .await
        .unwrap();

        assert_eq!(row.0, "1706.03762");
        assert_eq!(row.1, "download");
    }

    #[tokio::test]
    async fn test_record_search_and_recent_order() {
        let log = log().await;
        log.record_search("alice", "transformers").await.unwrap();
        log.record_search("alice", "diffusion models").await.unwrap();
        log.record_search("bob", "graph networks").await.unwrap();

        let recent = log.recent_searches("alice", 10).await.unwrap();
        assert_eq!(recent, vec!["diffusion models", "transformers"]);
    }

    #[tokio::test]
    async fn test_best_effort_swallows_failure() {
        let db = Database::new_in_memory().await.unwrap();
        let log = InteractionLog::new(db.clone());
        db.close().await;

        // Pool is closed, so the insert fails; the wrapper must not panic
        // or propagate.
        log.record_best_effort("alice", "1706.03762", ActionKind::Download)
            .await;
        log.record_search_best_effort("alice", "transformers").await;
    }

    #[test]
    fn test_action_kind_strings() {
        assert_eq!(ActionKind::Download.as_str(), "download");
        assert_eq!(ActionKind::Select.as_str(), "select");
    }
}
