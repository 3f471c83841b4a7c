//! Shared helpers for API tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum_test::TestServer;

use feedhub::cache::MemoryCacheStore;
use feedhub::config::Config;
use feedhub::rss::{FeedFetcher, FeedItem, FeedRegistry, FeedResult, FeedSource};
use feedhub::web::middleware::RateLimitState;
use feedhub::web::{create_router, AppState};
use feedhub::{FeedHubError, RefreshOrchestrator};

pub const TEST_UPDATE_KEY: &str = "test-update-key";

/// Fetcher that answers without network access and counts calls.
///
/// URLs containing `bad` fail with a 500-style error; every other URL
/// yields one item titled after the source.
#[derive(Default)]
pub struct StubFetcher {
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedFetcher for StubFetcher {
    async fn fetch(&self, source: &FeedSource) -> feedhub::Result<FeedResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if source.url.contains("bad") {
            return Err(FeedHubError::Http("HTTP error! status: 500".to_string()));
        }
        let item = FeedItem {
            id: 0,
            title: format!("{} item", source.title),
            link: format!("{}/1", source.url),
            pub_date: "2024-01-15T10:30:00.000Z".to_string(),
            description: None,
            content: None,
            summary: None,
        };
        Ok(FeedResult::new(source, vec![item], None))
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub orchestrator: Arc<RefreshOrchestrator>,
    pub store: Arc<MemoryCacheStore>,
    pub fetcher: Arc<StubFetcher>,
}

/// Test configuration: two sources, one of which fails.
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.apply_env([
        (
            "RSS_FEEDS".to_string(),
            r#"[{"title":"A","url":"http://good"},{"title":"B","url":"http://bad"}]"#.to_string(),
        ),
        ("CACHE_MAX_AGE".to_string(), "100".to_string()),
        ("UPDATE_KEY".to_string(), TEST_UPDATE_KEY.to_string()),
    ]);
    config.web.api_rate_limit = 1000;
    config.web.update_rate_limit = 1000;
    config
}

/// Build a test server around `config` with an in-memory store.
pub fn create_test_app(config: Config) -> TestApp {
    let store = Arc::new(MemoryCacheStore::new());
    let fetcher = Arc::new(StubFetcher::default());
    let registry = FeedRegistry::new(&config.feeds.sources);

    let orchestrator = Arc::new(RefreshOrchestrator::new(
        store.clone(),
        fetcher.clone(),
        &registry,
        &config.cache,
    ));

    let rate_limit = Arc::new(RateLimitState::new(
        config.web.update_rate_limit,
        config.web.api_rate_limit,
    ));
    let app_state = Arc::new(AppState::new(orchestrator.clone(), Arc::new(config)));
    let router = create_router(app_state, rate_limit);
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        orchestrator,
        store,
        fetcher,
    }
}

pub fn create_test_server() -> TestApp {
    create_test_app(create_test_config())
}
