//! Cache store abstraction and the in-memory backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::record::{CacheMeta, CacheRecord};
use crate::error::Result;
use crate::rss::{now_millis, FeedResult};

/// Key-value store holding feed snapshots.
///
/// Writes replace a record as a whole; a reader sees either the previous
/// record or the new one, never a mix.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name for logs and introspection.
    fn backend_name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Arc<CacheRecord>>>;

    /// Store a fully built record under `record.key`.
    async fn put_record(&self, record: CacheRecord) -> Result<()>;

    /// Remove the record. Returns whether one existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    async fn metadata(&self, key: &str) -> Result<Option<CacheMeta>>;

    /// Serialize `body` and store it stamped with the current time.
    async fn put(&self, key: &str, body: &[FeedResult], ttl_seconds: u64) -> Result<CacheMeta> {
        let record = CacheRecord::new(key, body, ttl_seconds, now_millis())?;
        let meta = record.meta();
        self.put_record(record).await?;
        Ok(meta)
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    records: RwLock<HashMap<String, Arc<CacheRecord>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Arc<CacheRecord>>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put_record(&self, record: CacheRecord) -> Result<()> {
        let record = Arc::new(record);
        self.records
            .write()
            .await
            .insert(record.key.clone(), record);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.records.write().await.remove(key).is_some())
    }

    async fn metadata(&self, key: &str) -> Result<Option<CacheMeta>> {
        Ok(self.records.read().await.get(key).map(|r| r.meta()))
    }
}
