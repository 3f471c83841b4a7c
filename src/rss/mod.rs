//! Feed sources, fetching, and parsing.

pub mod fetcher;
pub mod parser;
pub mod registry;
pub mod types;

pub use fetcher::{fetch_all, fetch_one, is_bot_challenge, FeedFetcher, HttpFeedFetcher};
pub use parser::{parse_feed, ParseLimits};
pub use registry::{default_entries, FeedRegistry, FeedSourceEntry};
pub use types::{
    now_iso, now_millis, FeedItem, FeedResult, FeedSource, ParseOutcome, MAX_CONTENT_LENGTH,
    MAX_FEED_SIZE, MAX_ITEMS_PER_FEED, NO_ITEMS_ERROR,
};
