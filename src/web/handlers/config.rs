//! Configuration handlers.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::AppState;
use crate::config::Config;

/// A source as exposed to the front-end.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicFeedSource {
    pub id: usize,
    pub title: String,
    pub url: String,
}

/// Display settings for the front-end.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySettings {
    pub items_per_feed_compact: usize,
    pub items_per_feed_expanded: usize,
    pub date_format: String,
    pub font_size: u32,
    pub timezone: String,
}

/// Public configuration response.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfigResponse {
    pub sources: Vec<PublicFeedSource>,
    /// Front-end polling interval in minutes.
    pub refresh_interval: u64,
    /// Snapshot lifetime in seconds.
    pub cache_max_age: u64,
    pub display: DisplaySettings,
}

impl PublicConfigResponse {
    /// Build from the configuration. Cookies and the update key are never
    /// included.
    pub fn from_config(config: &Config, sources: Vec<PublicFeedSource>) -> Self {
        let display = &config.display;
        Self {
            sources,
            refresh_interval: config.feeds.refresh_interval_mins,
            cache_max_age: config.cache.max_age_secs,
            display: DisplaySettings {
                items_per_feed_compact: display.items_per_feed_compact,
                items_per_feed_expanded: display.items_per_feed_expanded,
                date_format: display.date_format.clone(),
                font_size: display.font_size,
                timezone: display.timezone.clone(),
            },
        }
    }
}

/// Get the public configuration.
///
/// Lists the active sources and the display settings the front-end needs.
#[utoipa::path(
    get,
    path = "/api/config",
    tag = "Config",
    responses(
        (status = 200, description = "Public configuration", body = PublicConfigResponse)
    )
)]
pub async fn get_public_config(
    State(state): State<Arc<AppState>>,
) -> Json<PublicConfigResponse> {
    let sources = state
        .orchestrator
        .sources()
        .iter()
        .map(|s| PublicFeedSource {
            id: s.id,
            title: s.title.clone(),
            url: s.url.clone(),
        })
        .collect();
    Json(PublicConfigResponse::from_config(&state.config, sources))
}
