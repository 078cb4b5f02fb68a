//! # Storage Backends
//!
//! The persistence capability the stores depend on.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Storage trait                                   │
//! │                                                                         │
//! │   CatalogStore ─┐                        ┌──► JsonFileStorage           │
//! │                 ├──► S: Storage ─────────┤    products.json, carts.json │
//! │   CartStore ────┘    (whole collections) └──► SqliteStorage             │
//! │                                               one JSON document per row │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Backends always read and write whole collections. A `save_*` call either
//! replaces the persisted collection completely or fails without a partial
//! write becoming visible to the next `load_*`.

pub mod json;
pub mod sqlite;

use std::future::Future;

use storefront_core::{Cart, Product};

use crate::error::DbResult;

pub use json::JsonFileStorage;
pub use sqlite::SqliteStorage;

/// Whole-collection persistence for products and carts.
pub trait Storage: Send + Sync + 'static {
    /// Loads the catalog in stored order. A missing collection is empty.
    fn load_products(&self) -> impl Future<Output = DbResult<Vec<Product>>> + Send;

    /// Replaces the persisted catalog.
    fn save_products(&self, products: &[Product]) -> impl Future<Output = DbResult<()>> + Send;

    /// Loads every cart in stored order. A missing collection is empty.
    fn load_carts(&self) -> impl Future<Output = DbResult<Vec<Cart>>> + Send;

    /// Replaces the persisted cart collection.
    fn save_carts(&self, carts: &[Cart]) -> impl Future<Output = DbResult<()>> + Send;
}

// =============================================================================
// Backend Selection
// =============================================================================

/// The backend chosen by configuration.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    Json(JsonFileStorage),
    Sqlite(SqliteStorage),
}

impl StorageBackend {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageBackend::Json(_) => "json",
            StorageBackend::Sqlite(_) => "sqlite",
        }
    }

    /// Releases backend resources. Only the SQLite pool holds any.
    pub async fn close(&self) {
        if let StorageBackend::Sqlite(sqlite) = self {
            sqlite.database().close().await;
        }
    }
}

impl Storage for StorageBackend {
    async fn load_products(&self) -> DbResult<Vec<Product>> {
        match self {
            StorageBackend::Json(s) => s.load_products().await,
            StorageBackend::Sqlite(s) => s.load_products().await,
        }
    }

    async fn save_products(&self, products: &[Product]) -> DbResult<()> {
        match self {
            StorageBackend::Json(s) => s.save_products(products).await,
            StorageBackend::Sqlite(s) => s.save_products(products).await,
        }
    }

    async fn load_carts(&self) -> DbResult<Vec<Cart>> {
        match self {
            StorageBackend::Json(s) => s.load_carts().await,
            StorageBackend::Sqlite(s) => s.load_carts().await,
        }
    }

    async fn save_carts(&self, carts: &[Cart]) -> DbResult<()> {
        match self {
            StorageBackend::Json(s) => s.save_carts(carts).await,
            StorageBackend::Sqlite(s) => s.save_carts(carts).await,
        }
    }
}

impl From<JsonFileStorage> for StorageBackend {
    fn from(storage: JsonFileStorage) -> Self {
        StorageBackend::Json(storage)
    }
}

impl From<SqliteStorage> for StorageBackend {
    fn from(storage: SqliteStorage) -> Self {
        StorageBackend::Sqlite(storage)
    }
}
