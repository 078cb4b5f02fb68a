//! # storefront-sync: Realtime Product Feed
//!
//! Keeps every connected browser's copy of the catalog current.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Realtime Feed                                    │
//! │                                                                         │
//! │  ┌───────────────────┐  publish   ┌──────────────────────────────────┐ │
//! │  │   CatalogStore    │──────────► │             SyncHub              │ │
//! │  │  (storefront-db)  │ (snapshot) │  registry + bounded fan-out      │ │
//! │  └─────────▲─────────┘            │  GET /ws  ──► per-socket tasks   │ │
//! │            │                      └───────────────┬──────────────────┘ │
//! │            │ create                               │ newProduct         │
//! │  ┌─────────┴─────────┐                            │                    │
//! │  │   ProductIntake   │ ◄──────────────────────────┘                    │
//! │  │  (spawned task)   │      mpsc (Submission)                          │
//! │  └───────────────────┘                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`hub`] - `SyncHub` registry, fan-out and the `/ws` endpoint
//! - [`intake`] - `ProductIntake` task for `newProduct` submissions
//! - [`protocol`] - `{event, data}` push events
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! let (intake_tx, intake_rx) = mpsc::channel(DEFAULT_INTAKE_CAPACITY);
//! let hub = Arc::new(SyncHub::new(HubConfig::default(), intake_tx));
//! let catalog = Arc::new(CatalogStore::load(storage, hub.clone(), timeout).await?);
//! hub.publish(catalog.snapshot().await);
//! let intake = ProductIntake::new(catalog.clone()).start(intake_rx);
//! let app = Router::new().merge(hub.routes());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod hub;
pub mod intake;
pub mod protocol;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{SyncError, SyncResult};
pub use hub::{HubConfig, SubscriberId, Subscription, SyncHub};
pub use intake::{ProductIntake, Submission, DEFAULT_INTAKE_CAPACITY};
pub use protocol::PushEvent;
