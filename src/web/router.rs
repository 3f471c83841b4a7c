//! Router configuration for the API.

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, Uri},
    middleware::{self, Next},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{get_cache_status, get_feeds, get_public_config, update_cache, AppState};
use super::middleware::{api_rate_limit, create_cors_layer, update_rate_limit, RateLimitState};
use super::error::ApiError;
use super::openapi::ApiDoc;

/// Create the full application router.
pub fn create_router(app_state: Arc<AppState>, rate_limit: Arc<RateLimitState>) -> Router {
    let api_limit = rate_limit.clone();
    let read_routes = Router::new()
        .route("/api/feeds", get(get_feeds))
        .route("/api/cache", get(get_cache_status))
        .route("/cache", get(get_cache_status))
        .route("/api/config", get(get_public_config))
        .layer(middleware::from_fn(move |req: Request<Body>, next: Next| {
            let state = api_limit.clone();
            api_rate_limit(state, req, next)
        }));

    let update_limit = rate_limit;
    let update_routes = Router::new()
        .route("/api/update-cache", get(update_cache))
        .layer(middleware::from_fn(move |req: Request<Body>, next: Next| {
            let state = update_limit.clone();
            update_rate_limit(state, req, next)
        }));

    Router::new()
        .merge(read_routes)
        .merge(update_routes)
        .with_state(app_state)
        .merge(create_health_router())
        .merge(create_swagger_router())
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_ORIGIN,
                    HeaderValue::from_static("*"),
                ))
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer())
                .layer(CompressionLayer::new()),
        )
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Swagger UI at `/swagger-ui`, document at `/api-docs/openapi.json`.
pub fn create_swagger_router() -> Router {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("no route for {}", uri.path()))
}
