//! Write-back cache server
//!
//! Serves a directory of files over HTTP through a write-back cache.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use writeback_cache::{create_router, spawn_flush_task, with_cache, AppState, Config};

/// Main entry point for the write-back cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the data directory and build the cache
/// 4. Start background write-back task
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. On SIGINT/SIGTERM, stop serving and write every dirty value back
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "writeback_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting write-back cache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_entries={}, data_dir={}, port={}, flush_interval={}s, policy={:?}",
        config.max_entries,
        config.data_dir.display(),
        config.server_port,
        config.flush_interval,
        config.eviction_policy
    );

    let state = AppState::from_config(&config)
        .with_context(|| format!("opening data directory {}", config.data_dir.display()))?;
    info!("Cache initialized");

    let flush_handle = spawn_flush_task(state.cache.clone(), config.flush_interval);
    info!("Background write-back task started");

    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(flush_handle))
        .await
        .context("server error")?;

    // Final write-back; whatever fails here is lost
    match with_cache(&state.cache, |cache| Ok(cache.clear()?)).await {
        Ok(written) => info!("Wrote back {} entries on shutdown", written),
        Err(err) => error!("Shutdown write-back failed: {}", err),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the write-back task and allows graceful shutdown.
async fn shutdown_signal(flush_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", err);
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
                error!("Failed to install SIGTERM handler: {}", err);
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

    flush_handle.abort();
    warn!("Write-back task aborted");
}
