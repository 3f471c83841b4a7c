//! File-backed cache store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cache::record::{CacheMeta, CacheRecord};
use crate::cache::store::CacheStore;
use crate::error::{FeedHubError, Result};

/// Stores each record as a JSON file under a directory.
///
/// Writes go to a temporary file in the same directory which is then
/// renamed over the target, so readers never observe a partial record.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }

    async fn read_record(&self, key: &str) -> Result<Option<CacheRecord>> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: CacheRecord = serde_json::from_slice(&bytes).map_err(|e| {
            FeedHubError::Cache(format!("corrupt cache file {}: {e}", path.display()))
        })?;
        Ok(Some(record))
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<Arc<CacheRecord>>> {
        Ok(self.read_record(key).await?.map(Arc::new))
    }

    async fn put_record(&self, record: CacheRecord) -> Result<()> {
        let path = self.path_for(&record.key);
        let tmp = self.dir.join(format!(
            ".{}.{}.tmp",
            file_stem(&record.key),
            uuid::Uuid::new_v4()
        ));
        let bytes = serde_json::to_vec(&record)?;

        if let Err(e) = write_then_rename(&tmp, &path, &bytes).await {
            remove_temp(&tmp).await;
            return Err(e.into());
        }
        debug!("Wrote cache file {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn metadata(&self, key: &str) -> Result<Option<CacheMeta>> {
        Ok(self.read_record(key).await?.map(|r| r.meta()))
    }
}

async fn write_then_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(tmp, bytes).await?;
    tokio::fs::rename(tmp, path).await
}

/// Remove a temp file left by a failed write, if there is one.
async fn remove_temp(tmp: &Path) {
    match tokio::fs::remove_file(tmp).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove temp cache file {}: {}", tmp.display(), e),
    }
}

/// Map a cache key to a safe file name stem.
fn file_stem(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
