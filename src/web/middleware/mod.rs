//! Middleware for the API.

pub mod cors;
pub mod rate_limit;

pub use cors::create_cors_layer;
pub use rate_limit::{api_rate_limit, get_client_ip, update_rate_limit, RateLimitState};
