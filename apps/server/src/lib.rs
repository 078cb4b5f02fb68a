//! # Storefront Server
//!
//! REST API for the catalog and carts plus the `/ws` realtime feed.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Server                                │
//! │                                                                         │
//! │  HTTP ──► /api/products ──► CatalogStore ──┐                            │
//! │  HTTP ──► /api/carts    ──► CartStore      │ snapshot after commit      │
//! │                                            ▼                            │
//! │  WS   ──► /ws ◄──────────────────────── SyncHub                         │
//! │            │ newProduct                    ▲                            │
//! │            └──────────► ProductIntake ─────┘ (via CatalogStore)         │
//! │                                                                         │
//! │  Storage: JSON files or SQLite (StorageBackend)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//! 1. [`open_storage`] picks the backend from `[storage]`
//! 2. [`App::start`] loads both stores, seeds the hub and spawns the intake
//! 3. [`build_router`] serves the shared [`AppState`]
//! 4. [`App::shutdown`] stops the intake, flushes both stores, closes storage

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use storefront_db::{
    CartStore, CatalogStore, Database, DbConfig, DbResult, JsonFileStorage, SqliteStorage,
    StorageBackend,
};
use storefront_sync::{ProductIntake, SyncHub, DEFAULT_INTAKE_CAPACITY};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub use config::{ServerConfig, StorageKind};
pub use error::{ApiError, ApiResult};

// =============================================================================
// Application State
// =============================================================================

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogStore<StorageBackend>>,
    pub carts: Arc<CartStore<StorageBackend>>,
    pub hub: Arc<SyncHub>,
}

/// Builds the full router: `/api/*`, `/health` and `/ws`.
pub fn build_router(state: AppState) -> Router {
    let hub = state.hub.clone();
    Router::new()
        .nest("/api", routes::api())
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .merge(hub.routes())
}

// =============================================================================
// Startup / Shutdown
// =============================================================================

/// Opens the configured storage backend.
pub async fn open_storage(config: &ServerConfig) -> DbResult<StorageBackend> {
    let settings = &config.storage;
    tokio::fs::create_dir_all(&settings.data_dir).await?;

    let backend: StorageBackend = match settings.backend {
        StorageKind::Json => JsonFileStorage::open(&settings.data_dir).await?.into(),
        StorageKind::Sqlite => {
            let db = Database::new(DbConfig::new(settings.database_path())).await?;
            SqliteStorage::new(db).into()
        }
    };

    info!(
        backend = %settings.backend,
        data_dir = %settings.data_dir.display(),
        "Storage opened"
    );
    Ok(backend)
}

/// A running set of stores, hub and intake task.
pub struct App {
    pub state: AppState,
    storage: Arc<StorageBackend>,
    intake: JoinHandle<()>,
}

impl App {
    /// Loads both stores and wires them to a fresh hub.
    pub async fn start(storage: StorageBackend, config: &ServerConfig) -> DbResult<App> {
        let timeout = config.storage.persist_timeout();
        let storage = Arc::new(storage);

        let (intake_tx, intake_rx) = mpsc::channel(DEFAULT_INTAKE_CAPACITY);
        let hub = Arc::new(SyncHub::new(config.sync.hub_config(), intake_tx));

        let catalog = Arc::new(CatalogStore::load(storage.clone(), hub.clone(), timeout).await?);
        hub.publish(catalog.snapshot().await);

        let carts = Arc::new(CartStore::load(storage.clone(), catalog.clone(), timeout).await?);
        let intake = ProductIntake::new(catalog.clone()).start(intake_rx);

        info!(
            products = catalog.all().await.len(),
            carts = carts.list().await.len(),
            "Stores loaded"
        );

        Ok(App {
            state: AppState {
                catalog,
                carts,
                hub,
            },
            storage,
            intake,
        })
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Stops the intake, flushes both stores and releases storage.
    pub async fn shutdown(self) {
        self.intake.abort();

        if let Err(e) = self.state.catalog.flush().await {
            error!(error = %e, "Failed to flush catalog");
        }
        if let Err(e) = self.state.carts.flush().await {
            error!(error = %e, "Failed to flush carts");
        }

        self.storage.close().await;
        info!("Storage closed");
    }
}
