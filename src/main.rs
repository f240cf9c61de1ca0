//! File metadata service binary
//!
//! Wires the in-memory reference backends into the metadata cache, sweeper
//! and rate limiter, then serves the HTTP API until SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use file_meta_core::backends::{MemoryBlobStore, MemoryMetadataStore};
use file_meta_core::cache::LocalCacheBackend;
use file_meta_core::tasks::{
    spawn_cache_cleanup_task, spawn_rate_window_purge_task, spawn_sweeper_task,
};
use file_meta_core::{
    create_router, AppState, Config, ExpirationSweeper, FileService, MetadataCache, RateLimiter,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "file_meta_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting file metadata service");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, rate_limit={}/{:?}, cache_entries={}, retention={:?}, sweep_interval={:?}",
        config.server_port,
        config.rate_limit.limit,
        config.rate_limit.window,
        config.cache.max_entries,
        config.sweep.retention,
        config.sweep.interval
    );

    let store = Arc::new(MemoryMetadataStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let local_cache = Arc::new(LocalCacheBackend::new(config.cache.max_entries));
    let cache = Arc::new(MetadataCache::new(
        local_cache.clone(),
        store.clone(),
        &config.cache,
    ));
    let files = Arc::new(FileService::new(
        store.clone(),
        blobs.clone(),
        cache.clone(),
        config.cache.backend_timeout,
    ));
    let limiter = RateLimiter::from_config(&config.rate_limit);
    let sweeper = Arc::new(ExpirationSweeper::new(
        store,
        blobs,
        cache,
        config.sweep.clone(),
    ));

    let tasks = vec![
        spawn_cache_cleanup_task(local_cache.clone(), config.cache.cleanup_interval),
        spawn_rate_window_purge_task(limiter.clone(), config.rate_limit.purge_interval),
        spawn_sweeper_task(sweeper, config.sweep.interval),
    ];
    info!("Background tasks started");

    let state = AppState::new(files, limiter, config.rate_limit.trust_proxy_headers)
        .with_local_cache(local_cache);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    // Connect info gives the rate limiter a remote address to fall back on
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(tasks))
    .await
    .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM, then aborts the background tasks.
async fn shutdown_signal(tasks: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for task in &tasks {
        task.abort();
    }
    warn!("Background tasks aborted");
}
