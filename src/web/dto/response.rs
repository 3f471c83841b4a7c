//! Response DTOs for the API.

use serde::Serialize;
use utoipa::ToSchema;

use crate::datetime::{format_millis, millis_to_rfc3339};
use crate::refresh::{CacheStatus, FeedsOutcome};
use crate::rss::FeedResult;

// ============================================================================
// Feeds
// ============================================================================

/// Cache metadata attached to a feeds response.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    /// `hit`, `stale`, `miss` or `refresh`.
    pub status: String,
    /// Snapshot time (ms since epoch).
    pub timestamp: i64,
    /// Snapshot time as RFC3339.
    pub last_update: Option<String>,
    /// Snapshot age in seconds.
    pub age: i64,
    /// Snapshot lifetime in seconds.
    pub ttl: u64,
    /// A background refresh is replacing this snapshot.
    pub updating: bool,
}

/// `GET /api/feeds` envelope.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FeedsResponse {
    pub data: Vec<FeedResult>,
    pub cache: CacheInfo,
}

impl From<FeedsOutcome> for FeedsResponse {
    fn from(outcome: FeedsOutcome) -> Self {
        let cache = CacheInfo {
            status: outcome.decision.status().to_string(),
            timestamp: outcome.timestamp,
            last_update: millis_to_rfc3339(outcome.timestamp),
            age: outcome.age_ms / 1000,
            ttl: outcome.ttl_seconds,
            updating: outcome.updating,
        };
        Self {
            data: outcome.data,
            cache,
        }
    }
}

// ============================================================================
// Update cache
// ============================================================================

/// Diagnostics returned by `/api/update-cache`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCacheDebug {
    pub old_timestamp: Option<i64>,
    pub new_timestamp: Option<i64>,
    /// Number of sources in the new snapshot.
    pub data_length: usize,
    /// An existing snapshot was deleted first.
    pub cleared: bool,
    pub client: Option<String>,
    /// Handler time in milliseconds.
    pub elapsed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /api/update-cache` body, for success and failure alike.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpdateCacheResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<UpdateCacheDebug>,
}

impl UpdateCacheResponse {
    /// Body for a rejected key.
    pub fn forbidden() -> Self {
        Self {
            success: false,
            message: "非法访问".to_string(),
            cache: None,
            timestamp: None,
            debug: None,
        }
    }
}

// ============================================================================
// Cache introspection
// ============================================================================

/// State of the snapshot entry.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryInfo {
    pub exists: bool,
    /// Present and not expired.
    pub valid: bool,
    pub expired: bool,
    pub timestamp: Option<i64>,
    /// Snapshot time in the display timezone.
    pub formatted_time: Option<String>,
    /// Age in seconds.
    pub age: Option<i64>,
    /// Lifetime in seconds.
    pub ttl: Option<u64>,
    pub source_count: usize,
    pub size_bytes: usize,
    /// Store backend name.
    pub backend: String,
    /// A background refresh is running.
    pub refreshing: bool,
}

/// `GET /api/cache` body.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatusResponse {
    /// Current time in the display timezone.
    pub now: Option<String>,
    pub cache: CacheEntryInfo,
    pub key: String,
    pub elapsed_ms: u64,
}

impl CacheStatusResponse {
    pub fn new(status: CacheStatus, timezone: &str, elapsed_ms: u64) -> Self {
        let meta = status.meta.as_ref();
        let cache = CacheEntryInfo {
            exists: status.exists(),
            valid: status.valid(),
            expired: status.expired,
            timestamp: meta.map(|m| m.timestamp),
            formatted_time: meta.and_then(|m| format_millis(m.timestamp, timezone)),
            age: status.age_ms().map(|ms| ms / 1000),
            ttl: meta.map(|m| m.ttl_seconds),
            source_count: meta.map_or(0, |m| m.source_count),
            size_bytes: meta.map_or(0, |m| m.size_bytes),
            backend: status.backend.to_string(),
            refreshing: status.refreshing,
        };
        Self {
            now: format_millis(status.now_ms, timezone),
            cache,
            key: status.key,
            elapsed_ms,
        }
    }
}
