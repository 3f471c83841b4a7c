//! Web server for feedhub.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::WebConfig;
use crate::{FeedHubError, Result};

use super::handlers::AppState;
use super::middleware::RateLimitState;
use super::router::create_router;

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Rate limit state.
    rate_limit: Arc<RateLimitState>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &WebConfig, app_state: Arc<AppState>) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| {
                FeedHubError::Config(format!(
                    "invalid web server address {}:{}: {}",
                    config.host, config.port, e
                ))
            })?;

        let rate_limit = Arc::new(RateLimitState::new(
            config.update_rate_limit,
            config.api_rate_limit,
        ));

        Ok(Self {
            addr,
            app_state,
            rate_limit,
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn router(&self) -> Router {
        create_router(self.app_state.clone(), self.rate_limit.clone())
    }

    /// Run the web server until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();
        let local_addr = listener.local_addr()?;

        self.rate_limit.clone().start_cleanup_task();
        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        tracing::info!("Web server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::config::Config;
    use crate::refresh::RefreshOrchestrator;
    use crate::rss::{FeedRegistry, HttpFeedFetcher};

    fn create_test_state() -> Arc<AppState> {
        let config = Config::default();
        let orchestrator = RefreshOrchestrator::new(
            Arc::new(MemoryCacheStore::new()),
            Arc::new(HttpFeedFetcher::new(&config.fetch).unwrap()),
            &FeedRegistry::new(&[]),
            &config.cache,
        );
        Arc::new(AppState::new(Arc::new(orchestrator), Arc::new(config)))
    }

    fn create_test_config() -> WebConfig {
        WebConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_web_server_new() {
        let server = WebServer::new(&create_test_config(), create_test_state()).unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
    }

    #[test]
    fn test_web_server_invalid_host() {
        let config = WebConfig {
            host: "not a host".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            WebServer::new(&config, create_test_state()),
            Err(FeedHubError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_web_server_serves_until_shutdown() {
        let server = WebServer::new(&create_test_config(), create_test_state()).unwrap();
        let listener = TcpListener::bind(server.addr()).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let handle = tokio::spawn(server.serve(listener, async move {
            let _ = stop_rx.await;
        }));

        let resp = reqwest::Client::new()
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
        assert_eq!(resp.text().await.unwrap(), "OK");

        stop_tx.send(()).unwrap();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
