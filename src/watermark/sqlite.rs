//! SQLite-backed watermark store.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::{non_empty, WatermarkStore};
use crate::Result;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS watermarks (
    key TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
)
"#;

/// Stores watermarks as rows of a `watermarks` table.
#[derive(Debug, Clone)]
pub struct SqliteWatermarkStore {
    pool: SqlitePool,
}

impl SqliteWatermarkStore {
    /// Open (creating if missing) the database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("Opening watermark database: {}", path.display());

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .synchronous(SqliteSynchronous::Full);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    /// Open a private in-memory database.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl WatermarkStore for SqliteWatermarkStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let url: Option<String> = sqlx::query_scalar("SELECT url FROM watermarks WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(url.and_then(non_empty))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO watermarks (key, url, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET url = excluded.url, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        info!("Set {} to {}", key, value);
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM watermarks WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        debug!("Cleared {} ({} rows)", key, result.rows_affected());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_clear() {
        let store = SqliteWatermarkStore::open_in_memory().await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());

        store.set("k", "http://blog.example.com/a").await.unwrap();
        store.set("k", "http://blog.example.com/b").await.unwrap();
        assert_eq!(
            store.get("k").await.unwrap().as_deref(),
            Some("http://blog.example.com/b")
        );

        store.clear("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
        store.clear("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_value_reads_as_absent() {
        let store = SqliteWatermarkStore::open_in_memory().await.unwrap();
        store.set("k", "").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("vidsat.db");

        {
            let store = SqliteWatermarkStore::open(&path).await.unwrap();
            store.set("k", "http://blog.example.com/a").await.unwrap();
            store.pool.close().await;
        }

        let store = SqliteWatermarkStore::open(&path).await.unwrap();
        assert_eq!(
            store.get("k").await.unwrap().as_deref(),
            Some("http://blog.example.com/a")
        );
    }
}
