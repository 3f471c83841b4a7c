//! Rate limiting middleware.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    num::NonZeroU32,
    sync::{Arc, RwLock},
    time::Duration,
};

use crate::web::error::ApiError;

/// Per-IP rate limiter using Governor.
pub type IpRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

type LimiterMap = RwLock<HashMap<String, Arc<IpRateLimiter>>>;

/// State for rate limiting.
#[derive(Clone)]
pub struct RateLimitState {
    /// Per-IP limiters for the cache update endpoint.
    update_limiters: Arc<LimiterMap>,
    /// Per-IP limiters for the read API.
    api_limiters: Arc<LimiterMap>,
    /// Update rate limit (requests per minute).
    update_rate_limit: u32,
    /// API rate limit (requests per minute).
    api_rate_limit: u32,
}

impl RateLimitState {
    pub fn new(update_rate_limit: u32, api_rate_limit: u32) -> Self {
        Self {
            update_limiters: Arc::new(RwLock::new(HashMap::new())),
            api_limiters: Arc::new(RwLock::new(HashMap::new())),
            update_rate_limit,
            api_rate_limit,
        }
    }

    /// Get or create a rate limiter for the given IP.
    fn get_or_create_limiter(
        limiters: &LimiterMap,
        ip: &str,
        requests_per_minute: u32,
    ) -> Arc<IpRateLimiter> {
        {
            let read_guard = limiters.read().unwrap_or_else(|e| e.into_inner());
            if let Some(limiter) = read_guard.get(ip) {
                return limiter.clone();
            }
        }

        let mut write_guard = limiters.write().unwrap_or_else(|e| e.into_inner());

        // Another request may have inserted it meanwhile.
        if let Some(limiter) = write_guard.get(ip) {
            return limiter.clone();
        }

        let quota =
            Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN));
        let limiter = Arc::new(RateLimiter::direct(quota));
        write_guard.insert(ip.to_string(), limiter.clone());
        limiter
    }

    /// Check if a cache update request is allowed.
    pub fn check_update(&self, ip: &str) -> bool {
        Self::get_or_create_limiter(&self.update_limiters, ip, self.update_rate_limit)
            .check()
            .is_ok()
    }

    /// Check if a read API request is allowed.
    pub fn check_api(&self, ip: &str) -> bool {
        Self::get_or_create_limiter(&self.api_limiters, ip, self.api_rate_limit)
            .check()
            .is_ok()
    }

    /// Number of tracked client addresses.
    pub fn tracked_clients(&self) -> usize {
        let update = self.update_limiters.read().unwrap_or_else(|e| e.into_inner());
        let api = self.api_limiters.read().unwrap_or_else(|e| e.into_inner());
        update.len() + api.len()
    }

    /// Drop limiters that nothing else references.
    pub fn cleanup(&self) {
        for limiters in [&self.update_limiters, &self.api_limiters] {
            limiters
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|_, v| Arc::strong_count(v) > 1);
        }
    }

    /// Start a background task to periodically clean up old entries.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(300)).await;
                self.cleanup();
            }
        });
    }
}

/// Extract client IP from request.
pub fn get_client_ip(req: &Request<Body>) -> String {
    // Reverse proxy first
    if let Some(forwarded) = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(ip) = forwarded.split(',').next() {
            let ip = ip.trim();
            if !ip.is_empty() {
                return ip.to_string();
            }
        }
    }

    if let Some(real_ip) = req
        .headers()
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
    {
        return real_ip.trim().to_string();
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// Rate limiting middleware for `/api/update-cache`.
pub async fn update_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = get_client_ip(&req);

    if !state.check_update(&ip) {
        tracing::warn!(ip = %ip, "Update rate limit exceeded");
        return ApiError::too_many_requests("Too many update requests. Please try again later.")
            .into_response();
    }

    next.run(req).await
}

/// Rate limiting middleware for the read API.
pub async fn api_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = get_client_ip(&req);

    if !state.check_api(&ip) {
        tracing::warn!(ip = %ip, "API rate limit exceeded");
        return ApiError::too_many_requests("Too many requests. Please try again later.")
            .into_response();
    }

    next.run(req).await
}
