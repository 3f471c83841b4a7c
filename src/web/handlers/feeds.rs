//! Aggregated feeds handler.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::refresh::{CacheDecision, FeedsOutcome};
use crate::web::dto::{FeedsQuery, FeedsResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Get the aggregated feeds.
///
/// Serves the cached snapshot when it is fresh, refetching every source
/// otherwise. `forceRefresh=true` fetches live data without touching the
/// cache.
#[utoipa::path(
    get,
    path = "/api/feeds",
    tag = "Feeds",
    params(FeedsQuery),
    responses(
        (status = 200, description = "Feeds with cache metadata", body = FeedsResponse,
            headers(
                ("X-Cache" = String, description = "HIT or MISS"),
                ("X-Cache-Timestamp" = i64, description = "Snapshot time in ms")
            )),
        (status = 429, description = "Rate limit exceeded", body = crate::web::error::ErrorBody),
        (status = 500, description = "Fetching failed as a whole", body = crate::web::error::ErrorBody)
    )
)]
pub async fn get_feeds(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedsQuery>,
) -> Result<Response, ApiError> {
    let outcome = state.orchestrator.get_feeds(query.force()).await?;

    let headers = cache_headers(&outcome);
    if query.wants_array() {
        return Ok((headers, Json(outcome.data)).into_response());
    }
    Ok((headers, Json(FeedsResponse::from(outcome))).into_response())
}

fn cache_headers(outcome: &FeedsOutcome) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-cache",
        HeaderValue::from_static(outcome.decision.header_value()),
    );
    headers.insert("x-cache-timestamp", HeaderValue::from(outcome.timestamp));

    let cache_control = if outcome.decision == CacheDecision::ForceRefresh {
        HeaderValue::from_static("no-store")
    } else {
        HeaderValue::from_str(&format!("public, max-age={}", outcome.ttl_seconds))
            .unwrap_or_else(|_| HeaderValue::from_static("no-store"))
    };
    headers.insert(header::CACHE_CONTROL, cache_control);
    headers
}
