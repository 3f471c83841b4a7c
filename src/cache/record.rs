//! Cached snapshot record.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rss::FeedResult;

/// Fixed key for the shared feed snapshot.
///
/// Independent of the requesting host so every front-end domain shares
/// one entry.
pub const FEEDS_CACHE_KEY: &str = "https://fixed-cache-key/api/feeds";

/// One serialized snapshot of all sources plus its freshness metadata.
///
/// A record is always built from a complete `Vec<FeedResult>`; stores
/// replace records wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    pub key: String,
    /// JSON-encoded `Vec<FeedResult>`.
    pub body: String,
    /// Write time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub ttl_seconds: u64,
    /// Number of sources in `body`.
    pub source_count: usize,
}

impl CacheRecord {
    /// Serialize `results` into a record stamped at `timestamp`.
    pub fn new(
        key: impl Into<String>,
        results: &[FeedResult],
        ttl_seconds: u64,
        timestamp: i64,
    ) -> Result<Self> {
        Ok(Self {
            key: key.into(),
            body: serde_json::to_string(results)?,
            timestamp,
            ttl_seconds,
            source_count: results.len(),
        })
    }

    /// Decode the body back into feed results.
    pub fn decode(&self) -> Result<Vec<FeedResult>> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Metadata without the body.
    pub fn meta(&self) -> CacheMeta {
        CacheMeta {
            key: self.key.clone(),
            timestamp: self.timestamp,
            ttl_seconds: self.ttl_seconds,
            size_bytes: self.body.len(),
            source_count: self.source_count,
        }
    }

    pub fn age_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.timestamp).max(0)
    }

    /// `now - timestamp >= ttl`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        expired(self.timestamp, self.ttl_seconds, now_ms)
    }

    /// Whether the record is past `ratio` of its lifetime.
    pub fn is_stale(&self, now_ms: i64, ratio: f64) -> bool {
        self.age_ms(now_ms) as f64 > ratio * ttl_ms(self.ttl_seconds) as f64
    }
}

/// Record metadata, available without decoding the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMeta {
    pub key: String,
    pub timestamp: i64,
    pub ttl_seconds: u64,
    pub size_bytes: usize,
    pub source_count: usize,
}

impl CacheMeta {
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.timestamp).max(0)
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        expired(self.timestamp, self.ttl_seconds, now_ms)
    }
}

fn ttl_ms(ttl_seconds: u64) -> i64 {
    i64::try_from(ttl_seconds.saturating_mul(1000)).unwrap_or(i64::MAX)
}

fn expired(timestamp: i64, ttl_seconds: u64, now_ms: i64) -> bool {
    now_ms.saturating_sub(timestamp) >= ttl_ms(ttl_seconds)
}
