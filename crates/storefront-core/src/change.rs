//! # Catalog Change Notification
//!
//! The seam between the catalog store and whoever wants to hear about
//! committed changes. The store depends only on [`ChangeSink`]; the realtime
//! hub in storefront-sync is one implementation.
//!
//! ```text
//! CatalogStore ──commit──► CatalogSnapshot { revision, products }
//!                                  │
//!                                  ▼
//!                        dyn ChangeSink::publish   (must not block)
//! ```

use std::sync::Arc;

use crate::types::Product;

/// The full catalog as of one committed mutation.
///
/// `revision` increases by one per commit, so receivers can discard
/// snapshots that arrive out of order.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub revision: u64,
    pub products: Arc<Vec<Product>>,
}

impl CatalogSnapshot {
    pub fn new(revision: u64, products: Vec<Product>) -> Self {
        CatalogSnapshot {
            revision,
            products: Arc::new(products),
        }
    }
}

/// Receives catalog snapshots after each successful mutation.
///
/// Implementations must return quickly; they are called on the request path.
pub trait ChangeSink: Send + Sync {
    fn publish(&self, snapshot: CatalogSnapshot);
}

/// A sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ChangeSink for NoopSink {
    fn publish(&self, _snapshot: CatalogSnapshot) {}
}
