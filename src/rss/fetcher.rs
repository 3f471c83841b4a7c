//! Feed fetcher.
//!
//! One HTTP GET per source with browser-like headers and a single retry
//! on 403. Every failure is folded into the source's [`FeedResult`] so a
//! broken feed never takes the whole response down.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE, REFERER};
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, warn};

use crate::config::FetchConfig;
use crate::error::{FeedHubError, Result};
use crate::rss::parser::{parse_feed, ParseLimits};
use crate::rss::types::{FeedResult, FeedSource};

/// Browser user agent sent to upstream feeds.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Accept header tuned for RSS/Atom with an HTML fallback.
pub const FEED_ACCEPT: &str = "application/rss+xml, application/atom+xml, application/xml, \
     text/xml, text/html;q=0.9, */*;q=0.8";

/// Upper bound for the 403 back-off.
pub const MAX_RETRY_DELAY_MS: u64 = 5000;

/// Markers of anti-bot interstitial pages (matched case-insensitively).
const BOT_CHALLENGE_MARKERS: &[&str] = &[
    "cf-browser-verification",
    "challenge-platform",
    "just a moment...",
    "cf_chl_opt",
    "attention required! | cloudflare",
    "captcha",
];

/// Fetches a single source.
///
/// Implementations may fail; [`fetch_one`] turns failures into an error
/// entry so callers always get a result per source.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, source: &FeedSource) -> Result<FeedResult>;
}

/// Fetch one source, containing any failure in the returned result.
pub async fn fetch_one(fetcher: &dyn FeedFetcher, source: &FeedSource) -> FeedResult {
    match fetcher.fetch(source).await {
        Ok(result) => result,
        Err(e) => {
            warn!(source = %source.url, error = %e, "Feed fetch failed");
            FeedResult::failed(source, e.to_string())
        }
    }
}

/// Fetch every source concurrently.
///
/// The output has one entry per source in input order. A source whose
/// task panics gets an error entry; the call itself only fails when
/// there is nothing to fetch.
pub async fn fetch_all(
    fetcher: Arc<dyn FeedFetcher>,
    sources: &[FeedSource],
) -> Result<Vec<FeedResult>> {
    if sources.is_empty() {
        return Err(FeedHubError::NoSources);
    }

    let started = Instant::now();
    let handles: Vec<_> = sources
        .iter()
        .cloned()
        .map(|source| {
            let fetcher = fetcher.clone();
            tokio::spawn(async move { fetch_one(fetcher.as_ref(), &source).await })
        })
        .collect();

    let joined = futures::future::join_all(handles).await;

    let results: Vec<FeedResult> = joined
        .into_iter()
        .zip(sources)
        .map(|(joined, source)| match joined {
            Ok(result) => result,
            Err(e) => {
                error!(source = %source.url, error = %e, "Feed task aborted");
                FeedResult::failed(source, format!("fetch task failed: {}", e))
            }
        })
        .collect();

    let failed = results.iter().filter(|r| r.is_error()).count();
    info!(
        sources = results.len(),
        failed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Fetched all feeds"
    );

    Ok(results)
}

/// Production fetcher backed by `reqwest`.
pub struct HttpFeedFetcher {
    client: Client,
    retry_delay: Duration,
    max_body_bytes: u64,
    limits: ParseLimits,
}

impl HttpFeedFetcher {
    /// Create a fetcher from the fetch configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(USER_AGENT)
            .gzip(true)
            .deflate(true)
            .build()
            .map_err(|e| FeedHubError::Http(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            retry_delay: Duration::from_millis(config.retry_delay_ms.min(MAX_RETRY_DELAY_MS)),
            max_body_bytes: config.max_body_bytes,
            limits: ParseLimits {
                max_items: config.max_items_per_feed,
                max_content_length: config.max_content_length,
            },
        })
    }

    async fn send(&self, source: &FeedSource, headers: HeaderMap) -> Result<reqwest::Response> {
        Ok(self.client.get(&source.url).headers(headers).send().await?)
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<Vec<u8>> {
        if let Some(len) = response.content_length() {
            if len > self.max_body_bytes {
                return Err(FeedHubError::Http(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    len, self.max_body_bytes
                )));
            }
        }

        let bytes = response.bytes().await?;
        if bytes.len() as u64 > self.max_body_bytes {
            return Err(FeedHubError::Http(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_body_bytes
            )));
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<FeedResult> {
        debug!(source = %source.url, "Fetching feed");

        let mut response = self.send(source, base_headers(source)).await?;

        if response.status() == StatusCode::FORBIDDEN {
            debug!(
                source = %source.url,
                delay_ms = self.retry_delay.as_millis() as u64,
                "Got 403, retrying with extra headers"
            );
            tokio::time::sleep(self.retry_delay).await;
            response = self.send(source, retry_headers(source)).await?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(FeedHubError::Http(format!(
                "HTTP error! status: {}",
                status.as_u16()
            )));
        }

        let body = self.read_body(response).await?;
        if is_bot_challenge(&body) {
            return Err(FeedHubError::Http(
                "blocked by anti-bot challenge page".to_string(),
            ));
        }

        let outcome = parse_feed(&body, &self.limits);
        debug!(
            source = %source.url,
            items = outcome.items.len(),
            "Parsed feed"
        );
        Ok(FeedResult::new(source, outcome.items, outcome.error))
    }
}

fn base_headers(source: &FeedSource) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(FEED_ACCEPT));
    if let Some(cookie) = source.cookie.as_deref() {
        match HeaderValue::from_str(cookie) {
            Ok(value) => {
                headers.insert(COOKIE, value);
            }
            Err(_) => warn!(source = %source.url, "Ignoring cookie with invalid characters"),
        }
    }
    headers
}

fn retry_headers(source: &FeedSource) -> HeaderMap {
    let mut headers = base_headers(source);
    if let Some(origin) = origin_of(&source.url) {
        if let Ok(value) = HeaderValue::from_str(&origin) {
            headers.insert(REFERER, value);
        }
    }
    for (name, value) in [
        ("accept-language", "zh-CN,zh;q=0.9,en;q=0.8"),
        ("cache-control", "no-cache"),
        ("pragma", "no-cache"),
        ("sec-fetch-dest", "document"),
        ("sec-fetch-mode", "navigate"),
        ("sec-fetch-site", "none"),
        ("upgrade-insecure-requests", "1"),
    ] {
        headers.insert(name, HeaderValue::from_static(value));
    }
    headers
}

fn origin_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let origin = parsed.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Whether the body looks like an anti-bot interstitial instead of a feed.
pub fn is_bot_challenge(body: &[u8]) -> bool {
    // Challenge pages put their markers near the top.
    let head = &body[..body.len().min(16 * 1024)];
    let text = String::from_utf8_lossy(head).to_lowercase();
    let looks_like_feed = ["<rss", "<feed", "<rdf:rdf"]
        .iter()
        .any(|tag| text.contains(tag));
    !looks_like_feed && BOT_CHALLENGE_MARKERS.iter().any(|m| text.contains(m))
}
