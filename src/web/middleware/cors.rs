//! CORS middleware configuration.

use axum::http::{HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};

/// Create the CORS layer.
///
/// The API is public and read-only, so any origin may call it. The cache
/// headers are exposed so browser clients can read them.
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any)
        .expose_headers([
            HeaderName::from_static("x-cache"),
            HeaderName::from_static("x-cache-timestamp"),
        ])
}
