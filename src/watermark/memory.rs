//! In-memory watermark store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{non_empty, WatermarkStore};
use crate::{Result, VidsatError};

/// Watermark store that lives only as long as the process.
///
/// Useful for one-off runs and for tests.
#[derive(Debug, Default)]
pub struct MemoryWatermarkStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| VidsatError::Watermark("watermark map poisoned".to_string()))
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermarkStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned().and_then(non_empty))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
