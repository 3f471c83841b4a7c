//! Feed data model shared by the fetcher, parser, cache, and API.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Default cap on items kept per feed.
pub const MAX_ITEMS_PER_FEED: usize = 50;

/// Maximum length (in chars) for description/content/summary fields.
pub const MAX_CONTENT_LENGTH: usize = 2000;

/// Maximum accepted response body (5MB).
pub const MAX_FEED_SIZE: u64 = 5 * 1024 * 1024;

/// Error message used when a feed parses but yields nothing.
pub const NO_ITEMS_ERROR: &str = "No items found in feed";

/// A configured feed source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FeedSource {
    /// Stable identifier (position in the configured list unless given).
    pub id: usize,
    /// Display title.
    pub title: String,
    /// Feed URL.
    pub url: String,
    /// Optional cookie sent with every request to this source.
    #[serde(default, skip_serializing)]
    pub cookie: Option<String>,
}

impl FeedSource {
    /// Create a new source without a cookie.
    pub fn new(id: usize, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            url: url.into(),
            cookie: None,
        }
    }

    /// Attach a cookie header value.
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }
}

/// A single entry extracted from a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    /// Position of the item inside its feed.
    pub id: usize,
    /// Item title.
    pub title: String,
    /// Link to the original article.
    pub link: String,
    /// Publication date as an ISO-8601 string.
    pub pub_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Outcome of fetching one source during a refresh cycle.
///
/// `items` and `error` may both be populated when some items were
/// recovered from an otherwise broken feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedResult {
    /// Source title.
    pub title: String,
    /// Source URL.
    pub url: String,
    /// When this result was produced (ISO-8601).
    pub last_update: String,
    /// Parsed items.
    pub items: Vec<FeedItem>,
    /// Per-source error, if any.
    pub error: Option<String>,
}

impl FeedResult {
    /// Build a result for `source` stamped with the current time.
    pub fn new(source: &FeedSource, items: Vec<FeedItem>, error: Option<String>) -> Self {
        Self {
            title: source.title.clone(),
            url: source.url.clone(),
            last_update: now_iso(),
            items,
            error,
        }
    }

    /// Build an empty result carrying only an error.
    pub fn failed(source: &FeedSource, error: impl Into<String>) -> Self {
        Self::new(source, Vec::new(), Some(error.into()))
    }

    /// Whether this source failed (fully or partially).
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Output of the feed parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub items: Vec<FeedItem>,
    pub error: Option<String>,
}

/// Current time as an RFC 3339 string with millisecond precision.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
