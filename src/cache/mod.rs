//! Snapshot cache.
//!
//! A single record under [`FEEDS_CACHE_KEY`] holds the last complete
//! aggregation. Expiry is checked by readers; stores never evict on
//! their own.

pub mod file;
pub mod record;
pub mod store;

use std::sync::Arc;

use tracing::info;

pub use file::FileCacheStore;
pub use record::{CacheMeta, CacheRecord, FEEDS_CACHE_KEY};
pub use store::{CacheStore, MemoryCacheStore};

use crate::config::{CacheBackend, CacheConfig};
use crate::error::Result;

/// Build the store selected by the configuration.
pub fn open_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>> {
    let store: Arc<dyn CacheStore> = match config.backend {
        CacheBackend::Memory => Arc::new(MemoryCacheStore::new()),
        CacheBackend::File => Arc::new(FileCacheStore::new(&config.dir)?),
    };
    info!("Cache store: {}", store.backend_name());
    Ok(store)
}
