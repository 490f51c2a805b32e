use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediashelf_core::{
    load_config, validate_config, Converter, FfmpegConverter, LibraryRefresher, LibraryService,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("mediashelf {}", VERSION);

    // Determine config path
    let config_path = std::env::var("MEDIASHELF_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Library roots: {:?}", config.library.roots);
    info!("Catalog path: {:?}", config.library.catalog_path);

    // Create converter
    let converter = Arc::new(FfmpegConverter::new(config.converter.clone()));
    match converter.validate().await {
        Ok(()) => info!("Converter ready: {}", converter.name()),
        Err(e) => warn!("Converter unavailable, conversions will fail: {}", e),
    }

    // Create library service
    let service = Arc::new(LibraryService::new(&config, converter));
    let restored = service
        .load_catalog()
        .await
        .context("Failed to load catalog")?;
    info!("Restored {} catalog entries", restored);

    let summary = service.scan().await;
    info!(
        "Initial scan: {} files, {} new, {} removed",
        summary.discovered, summary.added, summary.removed
    );
    if config.library.auto_convert {
        service.convert_all_pending();
    }

    // Start background refresh
    let refresher = LibraryRefresher::new(
        Arc::clone(&service),
        Duration::from_secs(config.library.refresh_interval_secs),
    );
    refresher.start();

    shutdown_signal().await;
    info!("Shutdown signal received");

    refresher.stop().await;
    match service.save_catalog().await {
        Ok(count) => info!("Saved {} catalog entries", count),
        Err(e) => error!("Failed to save catalog: {}", e),
    }
    service.shutdown().await;

    info!("mediashelf stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
