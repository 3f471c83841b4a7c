//! Configuration module for feedhub.
//!
//! Settings come from an optional TOML file and are then overlaid with
//! environment variables (`RSS_FEEDS`, `CACHE_MAX_AGE`, `UPDATE_KEY`, ...).
//! The resulting [`Config`] is passed explicitly to the components that
//! need it; there is no global configuration state.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use tracing::{error, warn};

use crate::rss::registry::{default_entries, FeedSourceEntry};
use crate::{FeedHubError, Result};

/// Web server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Shared secret for `/api/update-cache`. Empty disables the endpoint.
    #[serde(default)]
    pub update_key: String,
    /// Rate limit for general API endpoints (requests per minute per IP).
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: u32,
    /// Rate limit for the update-cache endpoint (requests per minute per IP).
    #[serde(default = "default_update_rate_limit")]
    pub update_rate_limit: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_api_rate_limit() -> u32 {
    120
}

fn default_update_rate_limit() -> u32 {
    10
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            update_key: String::new(),
            api_rate_limit: default_api_rate_limit(),
            update_rate_limit: default_update_rate_limit(),
        }
    }
}

/// Feed source configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedsConfig {
    /// Sources to aggregate.
    #[serde(default = "default_entries")]
    pub sources: Vec<FeedSourceEntry>,
    /// Front-end auto refresh interval in minutes.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_mins: u64,
}

fn default_refresh_interval() -> u64 {
    30
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            sources: default_entries(),
            refresh_interval_mins: default_refresh_interval(),
        }
    }
}

/// Cache backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    File,
}

impl FromStr for CacheBackend {
    type Err = FeedHubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "file" => Ok(CacheBackend::File),
            other => Err(FeedHubError::Config(format!(
                "unknown cache backend: {other}"
            ))),
        }
    }
}

/// Snapshot cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Snapshot lifetime in seconds.
    #[serde(default = "default_cache_max_age")]
    pub max_age_secs: u64,
    /// Fraction of the lifetime after which a hit triggers a background refresh.
    #[serde(default = "default_stale_ratio")]
    pub stale_ratio: f64,
    /// Backing store.
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackend,
    /// Directory for the file backend.
    #[serde(default = "default_cache_dir")]
    pub dir: String,
    /// Schedule a refresh as soon as the server starts.
    #[serde(default = "default_warm_on_start")]
    pub warm_on_start: bool,
}

fn default_cache_max_age() -> u64 {
    1800 // 30 minutes
}

fn default_stale_ratio() -> f64 {
    0.8
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::Memory
}

fn default_cache_dir() -> String {
    "data/cache".to_string()
}

fn default_warm_on_start() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_cache_max_age(),
            stale_ratio: default_stale_ratio(),
            backend: default_cache_backend(),
            dir: default_cache_dir(),
            warm_on_start: default_warm_on_start(),
        }
    }
}

/// Upstream fetch configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total per-source timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Delay before the single retry after a 403, in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Maximum response body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
    /// Maximum items kept per feed.
    #[serde(default = "default_max_items")]
    pub max_items_per_feed: usize,
    /// Maximum description/content length in characters.
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_fetch_timeout() -> u64 {
    15
}

fn default_max_redirects() -> usize {
    5
}

fn default_retry_delay() -> u64 {
    1000
}

fn default_max_body_bytes() -> u64 {
    crate::rss::MAX_FEED_SIZE
}

fn default_max_items() -> usize {
    crate::rss::MAX_ITEMS_PER_FEED
}

fn default_max_content_length() -> usize {
    crate::rss::MAX_CONTENT_LENGTH
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_fetch_timeout(),
            max_redirects: default_max_redirects(),
            retry_delay_ms: default_retry_delay(),
            max_body_bytes: default_max_body_bytes(),
            max_items_per_feed: default_max_items(),
            max_content_length: default_max_content_length(),
        }
    }
}

/// Front-end display settings, exposed through `/api/config`.
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_items_compact")]
    pub items_per_feed_compact: usize,
    #[serde(default = "default_items_expanded")]
    pub items_per_feed_expanded: usize,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    /// Timezone used when formatting cache times (e.g., "Asia/Shanghai").
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_items_compact() -> usize {
    10
}

fn default_items_expanded() -> usize {
    15
}

fn default_date_format() -> String {
    "yyyy-MM-dd HH:mm".to_string()
}

fn default_font_size() -> u32 {
    16
}

fn default_timezone() -> String {
    "Asia/Shanghai".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            items_per_feed_compact: default_items_compact(),
            items_per_feed_expanded: default_items_expanded(),
            date_format: default_date_format(),
            font_size: default_font_size(),
            timezone: default_timezone(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty logs to stdout only.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/feedhub.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FeedHubError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FeedHubError::Config(format!("config parse error: {e}")))
    }

    /// Load configuration from the process environment only.
    pub fn load_from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(std::env::vars());
        config
    }

    /// Overlay environment variables onto the configuration.
    ///
    /// Supported variables:
    /// - `RSS_FEEDS`: JSON array of `{title, url}` objects
    /// - `CACHE_MAX_AGE`: snapshot lifetime in seconds
    /// - `UPDATE_KEY`: shared secret for `/api/update-cache`
    /// - `REFRESH_INTERVAL`: front-end refresh interval in minutes
    /// - `ITEMS_PER_FEED_COMPACT`, `ITEMS_PER_FEED_EXPANDED`, `DATE_FORMAT`,
    ///   `FONT_SIZE`, `TIMEZONE`: display settings
    /// - `FEEDHUB_HOST`, `FEEDHUB_PORT`, `FEEDHUB_LOG_LEVEL`, `FEEDHUB_LOG_FILE`,
    ///   `FEEDHUB_CACHE_BACKEND`, `FEEDHUB_CACHE_DIR`
    ///
    /// Unparsable values are logged and ignored.
    pub fn apply_env<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "RSS_FEEDS" => self.feeds.sources = parse_rss_feeds(value),
                "CACHE_MAX_AGE" => set_parsed(&mut self.cache.max_age_secs, &key, value),
                "UPDATE_KEY" => self.web.update_key = value.to_string(),
                "REFRESH_INTERVAL" => {
                    set_parsed(&mut self.feeds.refresh_interval_mins, &key, value)
                }
                "ITEMS_PER_FEED_COMPACT" => {
                    set_parsed(&mut self.display.items_per_feed_compact, &key, value)
                }
                "ITEMS_PER_FEED_EXPANDED" => {
                    set_parsed(&mut self.display.items_per_feed_expanded, &key, value)
                }
                "DATE_FORMAT" => self.display.date_format = value.to_string(),
                "FONT_SIZE" => set_parsed(&mut self.display.font_size, &key, value),
                "TIMEZONE" => self.display.timezone = value.to_string(),
                "FEEDHUB_HOST" => self.web.host = value.to_string(),
                "FEEDHUB_PORT" => set_parsed(&mut self.web.port, &key, value),
                "FEEDHUB_LOG_LEVEL" => self.logging.level = value.to_string(),
                "FEEDHUB_LOG_FILE" => self.logging.file = value.to_string(),
                "FEEDHUB_CACHE_BACKEND" => set_parsed(&mut self.cache.backend, &key, value),
                "FEEDHUB_CACHE_DIR" => self.cache.dir = value.to_string(),
                _ => {}
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.cache.max_age_secs == 0 {
            return Err(FeedHubError::Validation(
                "cache.max_age_secs must be greater than zero".to_string(),
            ));
        }
        if !(self.cache.stale_ratio > 0.0 && self.cache.stale_ratio <= 1.0) {
            return Err(FeedHubError::Validation(
                "cache.stale_ratio must be in (0, 1]".to_string(),
            ));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(FeedHubError::Validation(
                "fetch.timeout_secs must be greater than zero".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for source in &self.feeds.sources {
            if !seen.insert(source.url.trim()) {
                return Err(FeedHubError::Validation(format!(
                    "duplicate feed URL: {}",
                    source.url
                )));
            }
        }
        Ok(())
    }
}

/// Build the configuration from an optional file and an environment.
///
/// A missing file is not an error; the defaults are used instead.
pub fn load_config<I>(path: Option<&Path>, env: I) -> Result<Config>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut config = match path {
        Some(p) if p.exists() => Config::load(p)?,
        _ => Config::default(),
    };
    config.apply_env(env);
    Ok(config)
}

/// Parse `RSS_FEEDS`, falling back to the built-in list on any problem.
fn parse_rss_feeds(value: &str) -> Vec<FeedSourceEntry> {
    match serde_json::from_str::<Vec<FeedSourceEntry>>(value) {
        Ok(entries) if !entries.is_empty() => entries,
        Ok(_) => {
            warn!("RSS_FEEDS is an empty list, using default sources");
            default_entries()
        }
        Err(e) => {
            error!("RSS_FEEDS parsing error: {}, using default sources", e);
            default_entries()
        }
    }
}

fn set_parsed<T: FromStr>(target: &mut T, key: &str, value: &str) {
    match value.parse() {
        Ok(parsed) => *target = parsed,
        Err(_) => warn!("Ignoring invalid value for {}: {:?}", key, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.web.port, 8080);
        assert!(config.web.update_key.is_empty());
        assert_eq!(config.web.api_rate_limit, 120);
        assert_eq!(config.web.update_rate_limit, 10);

        assert_eq!(config.feeds.sources.len(), 3);
        assert_eq!(config.feeds.refresh_interval_mins, 30);

        assert_eq!(config.cache.max_age_secs, 1800);
        assert_eq!(config.cache.stale_ratio, 0.8);
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.dir, "data/cache");
        assert!(config.cache.warm_on_start);

        assert_eq!(config.fetch.timeout_secs, 15);
        assert_eq!(config.fetch.retry_delay_ms, 1000);
        assert_eq!(config.fetch.max_items_per_feed, 50);

        assert_eq!(config.display.items_per_feed_compact, 10);
        assert_eq!(config.display.items_per_feed_expanded, 15);
        assert_eq!(config.display.timezone, "Asia/Shanghai");

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/feedhub.log");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[web]
host = "127.0.0.1"
port = 3000
update_key = "secret"
api_rate_limit = 60
update_rate_limit = 2

[feeds]
refresh_interval_mins = 10

[[feeds.sources]]
title = "A"
url = "http://a.test/rss"

[[feeds.sources]]
id = 7
title = "B"
url = "http://b.test/rss"
cookie = "x=1"

[cache]
max_age_secs = 600
stale_ratio = 0.5
backend = "file"
dir = "/tmp/feedhub"
warm_on_start = false

[fetch]
timeout_secs = 5
retry_delay_ms = 200
max_items_per_feed = 20

[display]
font_size = 18
timezone = "UTC"

[logging]
level = "debug"
file = "custom/app.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.web.host, "127.0.0.1");
        assert_eq!(config.web.port, 3000);
        assert_eq!(config.web.update_key, "secret");
        assert_eq!(config.web.update_rate_limit, 2);

        assert_eq!(config.feeds.refresh_interval_mins, 10);
        assert_eq!(config.feeds.sources.len(), 2);
        assert_eq!(config.feeds.sources[1].id, Some(7));
        assert_eq!(config.feeds.sources[1].cookie.as_deref(), Some("x=1"));

        assert_eq!(config.cache.max_age_secs, 600);
        assert_eq!(config.cache.stale_ratio, 0.5);
        assert_eq!(config.cache.backend, CacheBackend::File);
        assert!(!config.cache.warm_on_start);

        assert_eq!(config.fetch.timeout_secs, 5);
        assert_eq!(config.fetch.retry_delay_ms, 200);
        assert_eq!(config.fetch.max_items_per_feed, 20);
        // Unspecified keeps the default.
        assert_eq!(config.fetch.connect_timeout_secs, 10);

        assert_eq!(config.display.font_size, 18);
        assert_eq!(config.display.timezone, "UTC");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.cache.max_age_secs, 1800);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");
        match result {
            Err(FeedHubError::Config(msg)) => assert!(msg.contains("config parse error")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(FeedHubError::Io(_))));
    }

    #[test]
    fn test_apply_env_core_variables() {
        let mut config = Config::default();
        config.apply_env(env(&[
            (
                "RSS_FEEDS",
                r#"[{"title":"A","url":"http://good"},{"title":"B","url":"http://bad"}]"#,
            ),
            ("CACHE_MAX_AGE", "100"),
            ("UPDATE_KEY", "s3cret"),
            ("REFRESH_INTERVAL", "5"),
            ("FONT_SIZE", "20"),
            ("FEEDHUB_PORT", "9090"),
            ("FEEDHUB_CACHE_BACKEND", "file"),
            ("UNRELATED", "ignored"),
        ]));

        assert_eq!(config.feeds.sources.len(), 2);
        assert_eq!(config.feeds.sources[0].title, "A");
        assert_eq!(config.feeds.sources[1].url, "http://bad");
        assert_eq!(config.cache.max_age_secs, 100);
        assert_eq!(config.web.update_key, "s3cret");
        assert_eq!(config.feeds.refresh_interval_mins, 5);
        assert_eq!(config.display.font_size, 20);
        assert_eq!(config.web.port, 9090);
        assert_eq!(config.cache.backend, CacheBackend::File);
    }

    #[test]
    fn test_bad_rss_feeds_falls_back_to_defaults() {
        let mut config = Config::default();
        config.feeds.sources = vec![FeedSourceEntry::new("X", "http://x.test")];
        config.apply_env(env(&[("RSS_FEEDS", "{not json")]));
        assert_eq!(config.feeds.sources, default_entries());

        config.feeds.sources = vec![FeedSourceEntry::new("X", "http://x.test")];
        config.apply_env(env(&[("RSS_FEEDS", "[]")]));
        assert_eq!(config.feeds.sources, default_entries());
    }

    #[test]
    fn test_invalid_numbers_keep_previous_value() {
        let mut config = Config::default();
        config.apply_env(env(&[("CACHE_MAX_AGE", "soon"), ("FEEDHUB_PORT", "-1")]));
        assert_eq!(config.cache.max_age_secs, 1800);
        assert_eq!(config.web.port, 8080);
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = Config::default();
        config.web.update_key = "original".to_string();
        config.apply_env(env(&[("UPDATE_KEY", "  ")]));
        assert_eq!(config.web.update_key, "original");
    }

    #[test]
    fn test_load_config_without_file() {
        let config = load_config(
            Some(Path::new("definitely-missing.toml")),
            env(&[("CACHE_MAX_AGE", "60")]),
        )
        .unwrap();
        assert_eq!(config.cache.max_age_secs, 60);
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.cache.max_age_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cache.stale_ratio = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.fetch.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.feeds.sources = vec![
            FeedSourceEntry::new("A", "http://same"),
            FeedSourceEntry::new("B", "http://same"),
        ];
        match config.validate() {
            Err(FeedHubError::Validation(msg)) => assert!(msg.contains("duplicate")),
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_cache_backend_from_str() {
        assert_eq!("Memory".parse::<CacheBackend>().unwrap(), CacheBackend::Memory);
        assert_eq!("file".parse::<CacheBackend>().unwrap(), CacheBackend::File);
        assert!("redis".parse::<CacheBackend>().is_err());
    }
}
