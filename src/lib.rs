//! feedhub - server-side RSS/Atom aggregator
//!
//! Fetches a configured set of feeds concurrently, keeps the merged result
//! in a shared snapshot cache, and serves it as JSON over HTTP.

pub mod cache;
pub mod config;
pub mod datetime;
pub mod error;
pub mod logging;
pub mod refresh;
pub mod rss;
pub mod web;

pub use cache::{open_store, CacheRecord, CacheStore, FileCacheStore, MemoryCacheStore};
pub use config::{load_config, Config};
pub use error::{FeedHubError, Result};
pub use refresh::{CacheDecision, RefreshOrchestrator};
pub use rss::{FeedFetcher, FeedItem, FeedRegistry, FeedResult, FeedSource, HttpFeedFetcher};
pub use web::{create_router, AppState, WebServer};
