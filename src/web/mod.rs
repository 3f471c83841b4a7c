//! HTTP API.
//!
//! Serves the aggregated feeds, the manual refresh trigger, cache
//! introspection and the front-end configuration.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
