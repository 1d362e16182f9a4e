//! SQLite-backed record store
//!
//! Keeps one JSON record per path in a single table. Suited to
//! single-node deployments where the record tier should survive restarts
//! without an external database.

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::traits::RecordStore;
use crate::error::StoreError;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS cache_records (
    path TEXT PRIMARY KEY,
    record TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_cache_records_updated ON cache_records(updated_at);
"#;

/// Record store backed by a local SQLite database
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Open the database at `database_url`, creating file and schema if
    /// missing
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        sqlx::query(SCHEMA_SQL)
            .execute(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query("SELECT record FROM cache_records WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match row {
            Some(row) => {
                let raw: String = row.get("record");
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&value)?;

        sqlx::query(
            r#"
            INSERT INTO cache_records (path, record, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(path) DO UPDATE SET
                record = excluded.record,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(path)
        .bind(raw)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    async fn store_in(dir: &TempDir) -> SqliteRecordStore {
        let url = format!("sqlite://{}/records.db", dir.path().display());
        SqliteRecordStore::connect(&url).await.unwrap()
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).await;

        assert_eq!(store.get("processedDocuments/none").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).await;

        let record = json!({"html": "<p>x</p>", "sourceLastModified": 1000});
        store.set("processedDocuments/a", record.clone()).await.unwrap();

        assert_eq!(store.get("processedDocuments/a").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_set_replaces_wholesale() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).await;

        store
            .set("processedDocuments/a", json!({"html": "<p>old</p>", "extra": 1}))
            .await
            .unwrap();
        store
            .set("processedDocuments/a", json!({"htmlUrl": "https://cdn/a.html"}))
            .await
            .unwrap();

        let value = store.get("processedDocuments/a").await.unwrap().unwrap();
        assert_eq!(value, json!({"htmlUrl": "https://cdn/a.html"}));
        assert!(value.get("html").is_none());
    }

    #[tokio::test]
    async fn test_survives_reconnect() {
        let dir = TempDir::new().unwrap();
        {
            let store = store_in(&dir).await;
            store.set("k", json!("persisted")).await.unwrap();
        }

        let store = store_in(&dir).await;
        assert_eq!(store.get("k").await.unwrap(), Some(json!("persisted")));
    }
}
