//! Cache introspection handler.

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Instant;

use crate::web::dto::CacheStatusResponse;
use crate::web::handlers::AppState;

/// Inspect the cached snapshot.
///
/// Read-only: never fetches and never decodes the snapshot body.
#[utoipa::path(
    get,
    path = "/api/cache",
    tag = "Cache",
    responses(
        (status = 200, description = "Cache state", body = CacheStatusResponse),
        (status = 429, description = "Rate limit exceeded", body = crate::web::error::ErrorBody)
    )
)]
pub async fn get_cache_status(State(state): State<Arc<AppState>>) -> Response {
    let started = Instant::now();
    let status = state.orchestrator.status().await;
    let body = CacheStatusResponse::new(
        status,
        &state.config.display.timezone,
        started.elapsed().as_millis() as u64,
    );

    let mut response = Json(body).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    response
}
