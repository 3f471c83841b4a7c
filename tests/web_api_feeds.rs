//! `/api/feeds` tests.

mod common;

use axum::http::StatusCode;
use serde_json::Value;

use common::{create_test_app, create_test_config, create_test_server};
use feedhub::cache::{CacheRecord, CacheStore, FEEDS_CACHE_KEY};
use feedhub::rss::{now_millis, FeedResult, FeedSource};

#[tokio::test]
async fn test_first_call_misses_then_hits_with_identical_data() {
    let app = create_test_server();

    let first = app.server.get("/api/feeds").await;
    first.assert_status_ok();
    assert_eq!(first.header("x-cache"), "MISS");
    assert_eq!(first.header("access-control-allow-origin"), "*");
    assert_eq!(first.header("cache-control"), "public, max-age=100");
    let first_body: Value = first.json();

    assert_eq!(first_body["data"].as_array().unwrap().len(), 2);
    assert!(first_body["data"][0]["error"].is_null());
    assert_eq!(first_body["data"][0]["items"][0]["title"], "A item");
    assert_eq!(first_body["data"][1]["error"], "HTTP error! status: 500");
    assert_eq!(first_body["data"][1]["items"], serde_json::json!([]));
    assert_eq!(first_body["cache"]["status"], "miss");
    assert_eq!(first_body["cache"]["ttl"], 100);

    let second = app.server.get("/api/feeds").add_query_param("t", "12345").await;
    second.assert_status_ok();
    assert_eq!(second.header("x-cache"), "HIT");
    let second_body: Value = second.json();

    assert_eq!(first_body["data"], second_body["data"]);
    assert_eq!(second_body["cache"]["status"], "hit");
    assert_eq!(
        first.header("x-cache-timestamp"),
        second.header("x-cache-timestamp")
    );
    assert_eq!(app.fetcher.calls(), 2);
}

#[tokio::test]
async fn test_force_refresh_fetches_live_and_leaves_cache_alone() {
    let app = create_test_server();

    app.server.get("/api/feeds").await.assert_status_ok();
    let before = app.store.get(FEEDS_CACHE_KEY).await.unwrap().unwrap();
    assert_eq!(app.fetcher.calls(), 2);

    let forced = app
        .server
        .get("/api/feeds")
        .add_query_param("forceRefresh", "true")
        .await;
    forced.assert_status_ok();
    assert_eq!(forced.header("x-cache"), "MISS");
    assert_eq!(forced.header("cache-control"), "no-store");
    let body: Value = forced.json();
    assert_eq!(body["cache"]["status"], "refresh");

    assert_eq!(app.fetcher.calls(), 4);
    let after = app.store.get(FEEDS_CACHE_KEY).await.unwrap().unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_legacy_array_format() {
    let app = create_test_server();

    let response = app
        .server
        .get("/api/feeds")
        .add_query_param("format", "array")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();

    let list = body.as_array().expect("bare array");
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["title"], "A");
    assert_eq!(list[1]["title"], "B");
}

#[tokio::test]
async fn test_stale_cache_served_while_refreshing_in_background() {
    let app = create_test_server();
    let source = FeedSource::new(0, "A", "http://good");
    let cached = vec![FeedResult::new(&source, Vec::new(), None)];
    let written_at = now_millis() - 85_000;
    app.store
        .put_record(CacheRecord::new(FEEDS_CACHE_KEY, &cached, 100, written_at).unwrap())
        .await
        .unwrap();

    let response = app.server.get("/api/feeds").await;
    response.assert_status_ok();
    assert_eq!(response.header("x-cache"), "HIT");
    let body: Value = response.json();
    assert_eq!(body["cache"]["status"], "stale");
    assert_eq!(body["cache"]["updating"], true);
    assert_eq!(body["data"], serde_json::to_value(&cached).unwrap());

    app.orchestrator.wait_idle().await;
    assert_eq!(app.fetcher.calls(), 2);

    let record = app.store.get(FEEDS_CACHE_KEY).await.unwrap().unwrap();
    assert!(record.timestamp > written_at);
    assert_eq!(record.source_count, 2);
}

#[tokio::test]
async fn test_expired_cache_is_refetched() {
    let app = create_test_server();
    let written_at = now_millis() - 150_000;
    app.store
        .put_record(CacheRecord::new(FEEDS_CACHE_KEY, &[], 100, written_at).unwrap())
        .await
        .unwrap();

    let response = app.server.get("/api/feeds").await;
    response.assert_status_ok();
    assert_eq!(response.header("x-cache"), "MISS");
    let body: Value = response.json();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(app.fetcher.calls(), 2);
}

#[tokio::test]
async fn test_no_sources_is_a_server_error() {
    let mut config = create_test_config();
    config.feeds.sources.clear();
    let app = create_test_app(config);

    let response = app.server.get("/api/feeds").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "no feed sources configured");
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_unusable_sources_fall_back_to_defaults() {
    let mut config = create_test_config();
    config.apply_env([(
        "RSS_FEEDS".to_string(),
        r#"[{"title":"X","url":"ftp://x"}]"#.to_string(),
    )]);
    let app = create_test_app(config);

    let response = app.server.get("/api/feeds").await;
    response.assert_status_ok();
    let body: Value = response.json();

    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["V2EX", "NodeSeek", "Linux DO"]);
    assert_eq!(app.fetcher.calls(), 3);
}

#[tokio::test]
async fn test_api_rate_limit() {
    let mut config = create_test_config();
    config.web.api_rate_limit = 2;
    let app = create_test_app(config);

    app.server.get("/api/config").await.assert_status_ok();
    app.server.get("/api/config").await.assert_status_ok();
    let limited = app.server.get("/api/config").await;
    limited.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: Value = limited.json();
    assert_eq!(body["code"], "TOO_MANY_REQUESTS");

    // Health checks are not rate limited
    app.server.get("/health").await.assert_status_ok();
}
