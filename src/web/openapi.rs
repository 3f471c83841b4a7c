//! OpenAPI document.

use utoipa::OpenApi;

use crate::rss::{FeedItem, FeedResult};
use crate::web::dto::{
    CacheEntryInfo, CacheInfo, CacheStatusResponse, FeedsResponse, UpdateCacheDebug,
    UpdateCacheResponse,
};
use crate::web::error::{ErrorBody, ErrorCode};
use crate::web::handlers::config::{DisplaySettings, PublicConfigResponse, PublicFeedSource};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "feedhub API",
        version = "0.1.0",
        description = "Aggregated RSS/Atom feeds served from a shared snapshot cache"
    ),
    paths(
        crate::web::handlers::feeds::get_feeds,
        crate::web::handlers::update_cache::update_cache,
        crate::web::handlers::cache::get_cache_status,
        crate::web::handlers::config::get_public_config
    ),
    components(schemas(
        FeedItem,
        FeedResult,
        FeedsResponse,
        CacheInfo,
        UpdateCacheResponse,
        UpdateCacheDebug,
        CacheStatusResponse,
        CacheEntryInfo,
        PublicConfigResponse,
        PublicFeedSource,
        DisplaySettings,
        ErrorBody,
        ErrorCode
    )),
    tags(
        (name = "Feeds", description = "Aggregated feeds"),
        (name = "Cache", description = "Snapshot cache management"),
        (name = "Config", description = "Front-end configuration")
    )
)]
pub struct ApiDoc;
