//! # storefront-db: Storage Layer for the Storefront
//!
//! Persistence backends plus the two stores that own the storefront's
//! mutable state.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Data Flow                             │
//! │                                                                         │
//! │  HTTP route / newProduct intake                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  storefront-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │    Stores     │    │    Storage    │    │   Database   │   │   │
//! │  │   │  (store/)     │    │  (storage/)   │    │  (pool.rs)   │   │   │
//! │  │   │               │    │               │    │              │   │   │
//! │  │   │ CatalogStore  │───►│ JsonFile      │    │ SqlitePool   │   │   │
//! │  │   │ CartStore     │    │ Sqlite ───────┼───►│ migrations   │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ChangeSink::publish (storefront-sync hub)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - SQLite connection pool
//! - [`migrations`] - Embedded SQLite migrations
//! - [`storage`] - The `Storage` trait and its JSON / SQLite backends
//! - [`store`] - `CatalogStore` and `CartStore`
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_db::{CatalogStore, JsonFileStorage, StorageBackend};
//!
//! let storage = Arc::new(StorageBackend::from(JsonFileStorage::open("./data").await?));
//! let catalog = CatalogStore::load(storage, hub, DEFAULT_PERSIST_TIMEOUT).await?;
//! let product = catalog.create(&fields).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod storage;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use storage::{JsonFileStorage, SqliteStorage, Storage, StorageBackend};
pub use store::cart::CartStore;
pub use store::catalog::CatalogStore;
pub use store::DEFAULT_PERSIST_TIMEOUT;
