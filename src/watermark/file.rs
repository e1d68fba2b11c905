//! File-backed watermark store.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{non_empty, WatermarkStore};
use crate::{Result, VidsatError};

/// Stores each watermark in its own file named after the key.
///
/// Writes go to a temporary file in the same directory which is synced and
/// then renamed over the target, so a crash never leaves a torn value.
#[derive(Debug, Clone)]
pub struct FileWatermarkStore {
    dir: PathBuf,
}

impl FileWatermarkStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Run blocking file work off the async runtime.
    async fn blocking<T, F>(&self, key: &str, op: &str, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(PathBuf, PathBuf) -> io::Result<T> + Send + 'static,
    {
        let dir = self.dir.clone();
        let path = self.path_for(key);
        tokio::task::spawn_blocking(move || work(dir, path))
            .await
            .map_err(|e| VidsatError::Watermark(format!("failed to {op} {key}: {e}")))?
            .map_err(|e| VidsatError::Watermark(format!("failed to {op} {key}: {e}")))
    }
}

fn write_atomic(dir: &Path, path: &Path, value: &str) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(value.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    sync_dir(dir)
}

/// Flush the directory entry so the rename itself survives a power loss.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[async_trait]
impl WatermarkStore for FileWatermarkStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.blocking(key, "read", |_, path| match fs::read_to_string(path) {
            Ok(value) => Ok(non_empty(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let value_owned = value.to_string();
        self.blocking(key, "write", move |dir, path| {
            write_atomic(&dir, &path, &value_owned)
        })
        .await?;
        info!("Set {} to {}", key, value);
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<()> {
        let removed = self
            .blocking(key, "clear", |_, path| match fs::remove_file(path) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e),
            })
            .await?;
        if removed {
            debug!("Cleared {}", key);
        }
        Ok(())
    }
}
