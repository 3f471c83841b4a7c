//! Cache-aware refresh orchestration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::cache::{CacheMeta, CacheRecord, CacheStore, FEEDS_CACHE_KEY};
use crate::config::CacheConfig;
use crate::error::{FeedHubError, Result};
use crate::refresh::background::BackgroundTasks;
use crate::rss::{fetch_all, now_millis, FeedFetcher, FeedRegistry, FeedResult, FeedSource};

/// How a feeds request was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Caller asked for live data; the cache is neither read nor written.
    ForceRefresh,
    HitFresh,
    /// Cached data served while a background refresh replaces it.
    HitStaleRefreshing,
    /// Absent or expired; fetched live and written back.
    Miss,
}

impl CacheDecision {
    pub fn is_hit(self) -> bool {
        matches!(self, CacheDecision::HitFresh | CacheDecision::HitStaleRefreshing)
    }

    /// Value of the `X-Cache` header.
    pub fn header_value(self) -> &'static str {
        if self.is_hit() {
            "HIT"
        } else {
            "MISS"
        }
    }

    /// Value of `cache.status` in the response envelope.
    pub fn status(self) -> &'static str {
        match self {
            CacheDecision::ForceRefresh => "refresh",
            CacheDecision::HitFresh => "hit",
            CacheDecision::HitStaleRefreshing => "stale",
            CacheDecision::Miss => "miss",
        }
    }
}

/// Choose how to serve a request.
///
/// A record is stale once its age exceeds `stale_ratio` of its lifetime
/// and expired once the age reaches the full lifetime.
pub fn decide(
    force: bool,
    record: Option<&CacheRecord>,
    now_ms: i64,
    stale_ratio: f64,
) -> CacheDecision {
    if force {
        return CacheDecision::ForceRefresh;
    }
    match record {
        None => CacheDecision::Miss,
        Some(r) if r.is_expired(now_ms) => CacheDecision::Miss,
        Some(r) if r.is_stale(now_ms, stale_ratio) => CacheDecision::HitStaleRefreshing,
        Some(_) => CacheDecision::HitFresh,
    }
}

/// Result of serving a feeds request.
#[derive(Debug, Clone)]
pub struct FeedsOutcome {
    pub data: Vec<FeedResult>,
    pub decision: CacheDecision,
    /// Snapshot time in milliseconds since the epoch.
    pub timestamp: i64,
    pub age_ms: i64,
    pub ttl_seconds: u64,
    /// A background refresh is replacing the served snapshot.
    pub updating: bool,
}

/// Result of an unconditional refresh.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub data: Vec<FeedResult>,
    pub old_timestamp: Option<i64>,
    pub new_timestamp: i64,
}

/// Read-only view of the cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub key: String,
    pub backend: &'static str,
    pub now_ms: i64,
    pub meta: Option<CacheMeta>,
    pub expired: bool,
    pub refreshing: bool,
}

impl CacheStatus {
    pub fn exists(&self) -> bool {
        self.meta.is_some()
    }

    pub fn valid(&self) -> bool {
        self.exists() && !self.expired
    }

    pub fn age_ms(&self) -> Option<i64> {
        self.meta.as_ref().map(|m| m.age_ms(self.now_ms))
    }
}

/// Decides between cached and live data and keeps the snapshot current.
///
/// The orchestrator is the only writer of the snapshot. Concurrent
/// writers are not coordinated; the last write wins.
pub struct RefreshOrchestrator {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn FeedFetcher>,
    sources: Vec<FeedSource>,
    key: String,
    ttl_seconds: u64,
    stale_ratio: f64,
    tasks: BackgroundTasks,
    refreshing: AtomicBool,
}

impl RefreshOrchestrator {
    pub fn new(
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn FeedFetcher>,
        registry: &FeedRegistry,
        config: &CacheConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            sources: registry.sources().to_vec(),
            key: FEEDS_CACHE_KEY.to_string(),
            ttl_seconds: config.max_age_secs,
            stale_ratio: config.stale_ratio,
            tasks: BackgroundTasks::new(),
            refreshing: AtomicBool::new(false),
        }
    }

    /// Sources refreshed by this orchestrator, in output order.
    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    /// Whether a background refresh is running.
    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    /// Serve a feeds request.
    ///
    /// Fails only when the fan-out itself fails; nothing is written then.
    pub async fn get_feeds(self: &Arc<Self>, force: bool) -> Result<FeedsOutcome> {
        let now = now_millis();
        let record = if force { None } else { self.load().await };

        let decision = decide(force, record.as_deref(), now, self.stale_ratio);
        debug!("Feeds request decision: {:?}", decision);

        match (decision, record) {
            (CacheDecision::ForceRefresh, _) => {
                let data = self.fetch().await?;
                Ok(FeedsOutcome {
                    data,
                    decision,
                    timestamp: now_millis(),
                    age_ms: 0,
                    ttl_seconds: self.ttl_seconds,
                    updating: false,
                })
            }
            (CacheDecision::HitFresh | CacheDecision::HitStaleRefreshing, Some(record)) => {
                match record.decode() {
                    Ok(data) => {
                        let updating = decision == CacheDecision::HitStaleRefreshing;
                        if updating {
                            self.schedule_refresh("stale-refresh");
                        }
                        Ok(FeedsOutcome {
                            data,
                            decision,
                            timestamp: record.timestamp,
                            age_ms: record.age_ms(now),
                            ttl_seconds: record.ttl_seconds,
                            updating,
                        })
                    }
                    Err(e) => {
                        warn!("Discarding undecodable cache record: {}", e);
                        self.discard().await;
                        self.miss().await
                    }
                }
            }
            _ => self.miss().await,
        }
    }

    /// Fetch all sources and write the snapshot unconditionally.
    pub async fn refresh_and_store(&self) -> Result<RefreshReport> {
        let old_timestamp = match self.store.metadata(&self.key).await {
            Ok(meta) => meta.map(|m| m.timestamp),
            Err(e) => {
                warn!("Cache metadata read failed: {}", e);
                None
            }
        };

        let data = self.fetch().await?;
        let meta = self.store.put(&self.key, &data, self.ttl_seconds).await?;
        info!(
            "Cache refreshed: {} sources, {} bytes",
            meta.source_count, meta.size_bytes
        );

        Ok(RefreshReport {
            data,
            old_timestamp,
            new_timestamp: meta.timestamp,
        })
    }

    /// Delete the snapshot. Returns whether one existed.
    pub async fn clear(&self) -> Result<bool> {
        let existed = self.store.delete(&self.key).await?;
        info!("Cache cleared (existed: {})", existed);
        Ok(existed)
    }

    /// Inspect the snapshot without fetching or decoding it.
    pub async fn status(&self) -> CacheStatus {
        let now = now_millis();
        let meta = match self.store.metadata(&self.key).await {
            Ok(meta) => meta,
            Err(e) => {
                warn!("Cache metadata read failed: {}", e);
                None
            }
        };
        let expired = meta.as_ref().is_some_and(|m| m.is_expired(now));
        CacheStatus {
            key: self.key.clone(),
            backend: self.store.backend_name(),
            now_ms: now,
            meta,
            expired,
            refreshing: self.is_refreshing(),
        }
    }

    /// Schedule a background refresh unless one is already running.
    ///
    /// Returns whether a new refresh was scheduled.
    pub fn schedule_refresh(self: &Arc<Self>, reason: &'static str) -> bool {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Background refresh already in flight, skipping ({})", reason);
            return false;
        }

        let this = Arc::clone(self);
        self.tasks.spawn(reason, async move {
            let _flight = InFlight(&this.refreshing);
            let started = Instant::now();
            match this.fetch().await {
                Ok(data) => {
                    if this.write(&data).await.is_some() {
                        info!(
                            "Background refresh ({}) finished in {}ms",
                            reason,
                            started.elapsed().as_millis()
                        );
                    }
                }
                Err(e) => error!("Background refresh ({}) failed: {}", reason, e),
            }
        });
        true
    }

    /// Wait for all background work to finish.
    pub async fn wait_idle(&self) {
        self.tasks.wait_idle().await;
    }

    async fn fetch(&self) -> Result<Vec<FeedResult>> {
        fetch_all(Arc::clone(&self.fetcher), &self.sources).await
    }

    async fn miss(&self) -> Result<FeedsOutcome> {
        let data = self.fetch().await?;
        let timestamp = match self.write(&data).await {
            Some(meta) => meta.timestamp,
            None => now_millis(),
        };
        Ok(FeedsOutcome {
            data,
            decision: CacheDecision::Miss,
            timestamp,
            age_ms: 0,
            ttl_seconds: self.ttl_seconds,
            updating: false,
        })
    }

    /// Read the snapshot, treating store failures as absence.
    async fn load(&self) -> Option<Arc<CacheRecord>> {
        match self.store.get(&self.key).await {
            Ok(record) => record,
            Err(e @ FeedHubError::Cache(_)) => {
                warn!("Discarding unreadable cache record: {}", e);
                self.discard().await;
                None
            }
            Err(e) => {
                warn!("Cache read failed, treating as miss: {}", e);
                None
            }
        }
    }

    async fn write(&self, data: &[FeedResult]) -> Option<CacheMeta> {
        match self.store.put(&self.key, data, self.ttl_seconds).await {
            Ok(meta) => Some(meta),
            Err(e) => {
                error!("Cache write failed: {}", e);
                None
            }
        }
    }

    async fn discard(&self) {
        if let Err(e) = self.store.delete(&self.key).await {
            warn!("Failed to delete cache record: {}", e);
        }
    }
}

/// Clears the in-flight flag when the refresh ends, even by panic.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
