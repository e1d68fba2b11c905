//! Per-feed watermark persistence.
//!
//! A watermark is the canonical permalink of the newest item already shared
//! for a feed. Each feed has its own key derived from a hash of the feed URL,
//! so feeds never interfere with each other.

mod file;
mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::config::{WatermarkBackend, WatermarkConfig};
use crate::Result;

pub use file::FileWatermarkStore;
pub use memory::MemoryWatermarkStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteWatermarkStore;

/// Prefix of every watermark key.
pub const KEY_PREFIX: &str = "last_seen_url_";

/// Durable key/value storage for watermarks.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Read the watermark for `key`. An empty stored value reads as absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` for `key`. Must be durable when this returns.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the watermark for `key`. Clearing a missing key is not an error.
    async fn clear(&self, key: &str) -> Result<()>;
}

/// Derive the watermark key for a feed URL.
pub fn watermark_key(feed_url: &str) -> String {
    let digest = Sha256::digest(feed_url.trim().as_bytes());
    format!("{KEY_PREFIX}{digest:x}")
}

/// Open the store selected by the configuration.
pub async fn open_store(config: &WatermarkConfig) -> Result<Arc<dyn WatermarkStore>> {
    match config.backend {
        WatermarkBackend::File => Ok(Arc::new(FileWatermarkStore::new(&config.dir))),
        #[cfg(feature = "sqlite")]
        WatermarkBackend::Sqlite => {
            Ok(Arc::new(SqliteWatermarkStore::open(&config.database).await?))
        }
        #[cfg(not(feature = "sqlite"))]
        WatermarkBackend::Sqlite => Err(crate::VidsatError::Config(
            "watermark backend \"sqlite\" requires the sqlite feature".to_string(),
        )),
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
