//! Manual cache refresh handler.

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Instant;

use crate::rss::now_millis;
use crate::web::dto::{UpdateCacheDebug, UpdateCacheQuery, UpdateCacheResponse};
use crate::web::handlers::AppState;

/// Refresh the cached snapshot.
///
/// Requires `key` to match the configured secret. With `clear=true` the
/// existing snapshot is deleted first. The refresh always writes the
/// cache, unlike `forceRefresh` on `/api/feeds`.
#[utoipa::path(
    get,
    path = "/api/update-cache",
    tag = "Cache",
    params(UpdateCacheQuery),
    responses(
        (status = 200, description = "Snapshot refreshed", body = UpdateCacheResponse),
        (status = 403, description = "Key mismatch or endpoint disabled", body = UpdateCacheResponse),
        (status = 429, description = "Rate limit exceeded", body = crate::web::error::ErrorBody),
        (status = 500, description = "Refresh failed", body = UpdateCacheResponse)
    )
)]
pub async fn update_cache(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UpdateCacheQuery>,
) -> Response {
    let started = Instant::now();

    if !state.check_update_key(query.key.as_deref()) {
        tracing::warn!(client = ?query.client, "Rejected cache update: key mismatch");
        return respond(StatusCode::FORBIDDEN, UpdateCacheResponse::forbidden());
    }

    tracing::info!(client = ?query.client, clear = query.clear(), "Cache update requested");

    let mut debug = UpdateCacheDebug {
        old_timestamp: None,
        new_timestamp: None,
        data_length: 0,
        cleared: false,
        client: query.client.clone(),
        elapsed: 0,
        error: None,
    };

    let cleared = if query.clear() {
        state.orchestrator.clear().await
    } else {
        Ok(false)
    };
    let result = match cleared {
        Ok(cleared) => {
            debug.cleared = cleared;
            state.orchestrator.refresh_and_store().await
        }
        Err(e) => Err(e),
    };

    debug.elapsed = started.elapsed().as_millis() as u64;

    match result {
        Ok(report) => {
            debug.old_timestamp = report.old_timestamp;
            debug.new_timestamp = Some(report.new_timestamp);
            debug.data_length = report.data.len();
            respond(
                StatusCode::OK,
                UpdateCacheResponse {
                    success: true,
                    message: "RSS缓存已更新".to_string(),
                    cache: Some("已更新".to_string()),
                    timestamp: Some(now_millis()),
                    debug: Some(debug),
                },
            )
        }
        Err(e) => {
            tracing::error!("Cache update failed: {}", e);
            debug.error = Some(e.to_string());
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                UpdateCacheResponse {
                    success: false,
                    message: format!("更新缓存失败: {}", e),
                    cache: None,
                    timestamp: Some(now_millis()),
                    debug: Some(debug),
                },
            )
        }
    }
}

fn respond(status: StatusCode, body: UpdateCacheResponse) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    response
}
