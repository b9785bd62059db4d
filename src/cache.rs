//! Query-level result cache.
//!
//! Result sets are stored as JSON keyed by the exact query string. Lookups
//! do no normalization; `put` is a last-write-wins upsert with no TTL.

use sqlx::Row;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::paper::PaperRecord;

/// Errors raised by cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Database query failed.
    #[error("cache database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored or incoming result set could not be (de)serialized.
    #[error("cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// SQLite-backed cache of search result sets.
#[derive(Debug, Clone)]
pub struct ResultsCache {
    db: Database,
}

impl ResultsCache {
    /// Creates a cache over an existing database connection.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Looks up the cached result set for an exact query string.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Database` on query failure or
    /// `CacheError::Serialize` when a stored row cannot be decoded.
    #[instrument(skip(self))]
    pub async fn get(&self, query: &str) -> Result<Option<Vec<PaperRecord>>, CacheError> {
        let row = sqlx::query("SELECT results FROM cached_results WHERE query = ?")
            .bind(query)
            .fetch_optional(self.db.pool())
            .await?;

        let Some(row) = row else {
            debug!("cache miss");
            return Ok(None);
        };

        let json: String = row.try_get("results")?;
        let records: Vec<PaperRecord> = serde_json::from_str(&json)?;
        debug!(count = records.len(), "cache hit");
        Ok(Some(records))
    }

    /// Stores a result set for a query, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Serialize` if the records cannot be encoded,
    /// or `CacheError::Database` on write failure.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn put(&self, query: &str, records: &[PaperRecord]) -> Result<(), CacheError> {
        let json = serde_json::to_string(records)?;

        sqlx::query(
            "INSERT INTO cached_results (query, results, updated_at) \
             VALUES (?, ?, datetime('now')) \
             ON CONFLICT(query) DO UPDATE SET \
                 results = excluded.results, \
                 updated_at = excluded.updated_at",
        )
        .bind(query)
        .bind(json)
        .execute(self.db.pool())
        .await?;

        debug!("cache updated");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(id: &str, title: &str) -> PaperRecord {
        PaperRecord {
            title: title.to_string(),
            authors: vec!["Jacob Devlin".to_string()],
            published: "2018-10-11".to_string(),
            summary: "We introduce a new language representation model...".to_string(),
            arxiv_id: id.to_string(),
            pdf_url: None,
            category: Some("cs.CL".to_string()),
        }
    }

    async fn cache() -> ResultsCache {
        ResultsCache::new(Database::new_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_cache_miss_returns_none() {
        let cache = cache().await;
        let result = cache.get("never stored").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_cache_round_trip() {
        let cache = cache().await;
        let records = vec![record("1810.04805", "BERT")];

        cache.put("bert", &records).await.unwrap();
        let fetched = cache.get("bert").await.unwrap().unwrap();

        assert_eq!(fetched, records);
    }

    #[tokio::test]
    async fn test_cache_lookup_is_exact_string() {
        let cache = cache().await;
        cache.put("bert", &[record("1810.04805", "BERT")]).await.unwrap();

        assert!(cache.get("Bert").await.unwrap().is_none());
        assert!(cache.get("bert ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_put_twice_last_write_wins() {
        let cache = cache().await;
        cache.put("bert", &[record("1810.04805", "BERT")]).await.unwrap();
        cache
            .put("bert", &[record("1907.11692", "RoBERTa")])
            .await
            .unwrap();

        let fetched = cache.get("bert").await.unwrap().unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].arxiv_id, "1907.11692");

        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM cached_results WHERE query = 'bert'")
                .fetch_one(cache.db.pool())
                .await
                .unwrap();
        assert_eq!(count.0, 1, "Upsert must keep a single row per query");
    }

    #[tokio::test]
    async fn test_cache_stores_empty_result_set() {
        let cache = cache().await;
        cache.put("no matches", &[]).await.unwrap();

        let fetched = cache.get("no matches").await.unwrap();
        assert_eq!(fetched, Some(vec![]));
    }
}
