//! # Storefront
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Server                                │
//! │                                                                         │
//! │  Browser ───► HTTP (8080) ───► /api/* ───► Stores ───► JSON / SQLite    │
//! │     ▲                                         │                         │
//! │     └──────────── /ws ◄─── SyncHub ◄──────────┘                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `storefront [--config <path>]`

use std::path::PathBuf;

use anyhow::Context;
use storefront_server::{open_storage, App, ServerConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,storefront=debug,sqlx=warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting storefront server");

    let config = ServerConfig::load(config_path_from_args()).context("loading configuration")?;
    info!(
        address = %config.server.bind_address(),
        backend = %config.storage.backend,
        "Configuration loaded"
    );

    let storage = open_storage(&config).await.context("opening storage")?;
    let app = App::start(storage, &config)
        .await
        .context("loading stores")?;

    let listener = TcpListener::bind(config.server.bind_address())
        .await
        .with_context(|| format!("binding {}", config.server.bind_address()))?;
    info!(address = %listener.local_addr()?, "Listening");

    let served = axum::serve(listener, app.router())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    app.shutdown().await;
    served.context("serving HTTP")?;

    info!("Server shutdown complete");
    Ok(())
}

/// `--config <path>` or `--config=<path>`.
fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}
