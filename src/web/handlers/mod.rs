//! API handlers.

pub mod cache;
pub mod config;
pub mod feeds;
pub mod update_cache;

use std::sync::Arc;

pub use cache::get_cache_status;
pub use config::get_public_config;
pub use feeds::get_feeds;
pub use update_cache::update_cache;

use crate::config::Config;
use crate::refresh::RefreshOrchestrator;

/// Shared handler state.
pub struct AppState {
    pub orchestrator: Arc<RefreshOrchestrator>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(orchestrator: Arc<RefreshOrchestrator>, config: Arc<Config>) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    /// Check the shared secret for `/api/update-cache`.
    ///
    /// An empty configured secret disables the endpoint.
    pub fn check_update_key(&self, key: Option<&str>) -> bool {
        let secret = self.config.web.update_key.as_str();
        !secret.is_empty() && key == Some(secret)
    }
}
