//! # Stores
//!
//! The single writers of the product and cart collections.
//!
//! ## Mutation Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  one critical section per mutation                      │
//! │                                                                         │
//! │  lock ──► clone collection ──► apply change ──► persist (timeout)      │
//! │                                     │                 │                 │
//! │                                  Err → unlock     Err → unlock          │
//! │                                  (memory as before)                     │
//! │                                                       │ Ok              │
//! │                                                       ▼                 │
//! │                                           swap into memory ──► unlock   │
//! │                                                       │                 │
//! │                                                       ▼                 │
//! │                                     publish snapshot (catalog only)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cart;
pub mod catalog;

use std::future::Future;
use std::time::Duration;

use crate::error::{DbError, DbResult};

/// Default upper bound for one persistence write.
pub const DEFAULT_PERSIST_TIMEOUT: Duration = Duration::from_secs(5);

/// Awaits a persistence write, turning an overrun into `DbError::Timeout`.
pub(crate) async fn persist_within<F>(
    operation: &'static str,
    after: Duration,
    write: F,
) -> DbResult<()>
where
    F: Future<Output = DbResult<()>>,
{
    match tokio::time::timeout(after, write).await {
        Ok(result) => result,
        Err(_) => Err(DbError::Timeout { operation, after }),
    }
}

// =============================================================================
// Test Doubles
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use storefront_core::{Cart, CatalogSnapshot, ChangeSink, Product};

    use crate::error::{DbError, DbResult};
    use crate::storage::Storage;

    /// In-memory storage that can be told to fail or stall.
    #[derive(Default)]
    pub struct FlakyStorage {
        pub products: Mutex<Vec<Product>>,
        pub carts: Mutex<Vec<Cart>>,
        pub fail_writes: AtomicBool,
        pub stall_writes: AtomicBool,
    }

    impl FlakyStorage {
        pub fn with_products(products: Vec<Product>) -> Arc<Self> {
            let storage = FlakyStorage::default();
            *storage.products.lock().unwrap() = products;
            Arc::new(storage)
        }

        pub fn fail(&self, on: bool) {
            self.fail_writes.store(on, Ordering::SeqCst);
        }

        pub fn stall(&self, on: bool) {
            self.stall_writes.store(on, Ordering::SeqCst);
        }

        async fn gate(&self) -> DbResult<()> {
            if self.stall_writes.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(DbError::Persistence("disk unavailable".into()));
            }
            Ok(())
        }
    }

    impl Storage for FlakyStorage {
        async fn load_products(&self) -> DbResult<Vec<Product>> {
            Ok(self.products.lock().unwrap().clone())
        }

        async fn save_products(&self, products: &[Product]) -> DbResult<()> {
            self.gate().await?;
            *self.products.lock().unwrap() = products.to_vec();
            Ok(())
        }

        async fn load_carts(&self) -> DbResult<Vec<Cart>> {
            Ok(self.carts.lock().unwrap().clone())
        }

        async fn save_carts(&self, carts: &[Cart]) -> DbResult<()> {
            self.gate().await?;
            *self.carts.lock().unwrap() = carts.to_vec();
            Ok(())
        }
    }

    /// Sink that records every published snapshot.
    #[derive(Default)]
    pub struct RecordingSink {
        pub snapshots: Mutex<Vec<CatalogSnapshot>>,
    }

    impl RecordingSink {
        pub fn revisions(&self) -> Vec<u64> {
            self.snapshots
                .lock()
                .unwrap()
                .iter()
                .map(|s| s.revision)
                .collect()
        }
    }

    impl ChangeSink for RecordingSink {
        fn publish(&self, snapshot: CatalogSnapshot) {
            self.snapshots.lock().unwrap().push(snapshot);
        }
    }
}
