//! Configured feed sources.

use serde::Deserialize;
use tracing::warn;

use crate::rss::types::FeedSource;

/// A source entry as written in configuration (`RSS_FEEDS` or TOML).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedSourceEntry {
    /// Explicit identifier; defaults to the list position.
    #[serde(default)]
    pub id: Option<usize>,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub cookie: Option<String>,
}

impl FeedSourceEntry {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            url: url.into(),
            cookie: None,
        }
    }
}

/// Built-in source list used when nothing valid is configured.
pub fn default_entries() -> Vec<FeedSourceEntry> {
    vec![
        FeedSourceEntry::new("V2EX", "https://www.v2ex.com/index.xml"),
        FeedSourceEntry::new("NodeSeek", "https://rss.nodeseek.com"),
        FeedSourceEntry::new("Linux DO", "https://linux.do/latest.rss"),
    ]
}

/// Immutable list of sources, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRegistry {
    sources: Vec<FeedSource>,
}

impl FeedRegistry {
    /// Build the registry from configuration entries.
    ///
    /// Entries whose URL is not http(s) are dropped with a warning. If
    /// that leaves nothing from a non-empty list, the built-in defaults
    /// are used instead. An empty list stays empty.
    pub fn new(entries: &[FeedSourceEntry]) -> Self {
        let sources = validated(entries);
        if sources.is_empty() && !entries.is_empty() {
            warn!(
                configured = entries.len(),
                "No configured feed source is usable, using default sources"
            );
            return Self::defaults();
        }
        Self { sources }
    }

    /// Registry over the built-in default sources.
    pub fn defaults() -> Self {
        Self {
            sources: validated(&default_entries()),
        }
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

fn validated(entries: &[FeedSourceEntry]) -> Vec<FeedSource> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            if !is_http_url(&entry.url) {
                warn!(
                    title = %entry.title,
                    url = %entry.url,
                    "Dropping feed source with invalid URL"
                );
                return None;
            }
            let mut source = FeedSource::new(
                entry.id.unwrap_or(index),
                entry.title.trim(),
                entry.url.trim(),
            );
            source.cookie = entry.cookie.clone().filter(|c| !c.is_empty());
            Some(source)
        })
        .collect()
}

fn is_http_url(url: &str) -> bool {
    matches!(
        url::Url::parse(url.trim()).map(|u| u.scheme().to_string()).as_deref(),
        Ok("http") | Ok("https")
    )
}
