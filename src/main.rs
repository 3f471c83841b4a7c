use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};

use feedhub::{
    load_config, open_store, AppState, Config, FeedRegistry, HttpFeedFetcher,
    RefreshOrchestrator, WebServer,
};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::var("FEEDHUB_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    // Load configuration
    let config = match load_config(Some(&config_path), std::env::vars()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", config_path.display());
            eprintln!("Using default configuration.");
            Config::load_from_env()
        }
    };

    // Initialize logging
    if let Err(e) = feedhub::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        feedhub::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("feedhub exited with error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> feedhub::Result<()> {
    info!("feedhub - RSS aggregator");

    let registry = FeedRegistry::new(&config.feeds.sources);
    if registry.is_empty() {
        warn!("No feed sources configured; /api/feeds will fail");
    }
    for source in registry.sources() {
        info!("Feed source #{}: {} ({})", source.id, source.title, source.url);
    }
    if config.web.update_key.is_empty() {
        warn!("UPDATE_KEY is not set; /api/update-cache is disabled");
    }

    let store = open_store(&config.cache)?;
    let fetcher = Arc::new(HttpFeedFetcher::new(&config.fetch)?);
    let orchestrator = Arc::new(RefreshOrchestrator::new(
        store,
        fetcher,
        &registry,
        &config.cache,
    ));

    if config.cache.warm_on_start && !registry.is_empty() {
        orchestrator.schedule_refresh("warm-up");
    }

    let config = Arc::new(config);
    let state = Arc::new(AppState::new(orchestrator.clone(), config.clone()));
    let server = WebServer::new(&config.web, state)?;

    server.run(shutdown_signal()).await?;

    info!("Waiting for background refreshes to finish");
    orchestrator.wait_idle().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
