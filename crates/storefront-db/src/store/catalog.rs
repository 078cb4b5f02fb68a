//! # Catalog Store
//!
//! Owns the authoritative product list.
//!
//! ## Key Operations
//! - Paginated list (filter, sort, slice; see `storefront_core::query`)
//! - Create / full update / patch / delete with persist-then-commit
//! - Snapshot publication after every committed mutation
//!
//! ## Id Assignment
//! The store keeps a high-water mark that starts at `max(loaded) + 1` (so the
//! first product gets id 1) and only moves up. Deleting the highest product
//! does not free its id for the rest of the process lifetime.

use std::sync::Arc;
use std::time::Duration;

use storefront_core::query::run_query;
use storefront_core::validation::validate_product_fields;
use storefront_core::{
    CatalogSnapshot, ChangeSink, ListQuery, Page, Product, ProductFields, ProductId,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::storage::Storage;
use crate::store::persist_within;

struct CatalogState {
    products: Vec<Product>,
    revision: u64,
    next_id: ProductId,
}

/// The product catalog, backed by any [`Storage`].
///
/// ## Usage
/// ```rust,ignore
/// let catalog = CatalogStore::load(storage, hub, DEFAULT_PERSIST_TIMEOUT).await?;
/// let created = catalog.create(&fields).await?;
/// let page = catalog.list(&ListQuery::default()).await;
/// ```
pub struct CatalogStore<S> {
    storage: Arc<S>,
    state: Mutex<CatalogState>,
    sink: Arc<dyn ChangeSink>,
    persist_timeout: Duration,
}

impl<S: Storage> CatalogStore<S> {
    /// Loads the persisted catalog and starts at revision 0.
    pub async fn load(
        storage: Arc<S>,
        sink: Arc<dyn ChangeSink>,
        persist_timeout: Duration,
    ) -> DbResult<Self> {
        let products = storage.load_products().await?;
        let next_id = products.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        info!(products = products.len(), next_id, "Catalog loaded");

        Ok(CatalogStore {
            storage,
            state: Mutex::new(CatalogState {
                products,
                revision: 0,
                next_id,
            }),
            sink,
            persist_timeout,
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Filters, sorts and paginates the catalog.
    pub async fn list(&self, query: &ListQuery) -> Page<Product> {
        let state = self.state.lock().await;
        run_query(&state.products, query)
    }

    /// Every product in catalog order.
    pub async fn all(&self) -> Vec<Product> {
        self.state.lock().await.products.clone()
    }

    /// The current catalog together with its revision.
    pub async fn snapshot(&self) -> CatalogSnapshot {
        let state = self.state.lock().await;
        CatalogSnapshot::new(state.revision, state.products.clone())
    }

    pub async fn get(&self, id: ProductId) -> DbResult<Product> {
        let state = self.state.lock().await;
        state
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    pub async fn contains(&self, id: ProductId) -> bool {
        self.state.lock().await.products.iter().any(|p| p.id == id)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Validates and appends a new product.
    pub async fn create(&self, fields: &ProductFields) -> DbResult<Product> {
        let draft = validate_product_fields(fields)?;

        let product = self
            .mutate("create product", |products, id| {
                let product = draft.into_product(id);
                products.push(product.clone());
                Ok(product)
            })
            .await?;

        info!(product_id = product.id, code = %product.code, "Product created");
        Ok(product)
    }

    /// Replaces every field of a product except its id.
    ///
    /// `status` falls back to `true` when the payload omits it.
    pub async fn update(&self, id: ProductId, fields: &ProductFields) -> DbResult<Product> {
        let draft = validate_product_fields(fields)?;

        let product = self
            .mutate("update product", |products, _| {
                let slot = products
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or_else(|| DbError::not_found("Product", id))?;
                *slot = draft.into_product(id);
                Ok(slot.clone())
            })
            .await?;

        info!(product_id = id, "Product updated");
        Ok(product)
    }

    /// Applies only the fields present in `patch`, then re-validates.
    pub async fn patch(&self, id: ProductId, patch: &ProductFields) -> DbResult<Product> {
        let product = self
            .mutate("patch product", |products, _| {
                let slot = products
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or_else(|| DbError::not_found("Product", id))?;
                let draft = validate_product_fields(&patch.overlay(slot))?;
                *slot = draft.into_product(id);
                Ok(slot.clone())
            })
            .await?;

        info!(product_id = id, "Product patched");
        Ok(product)
    }

    /// Removes a product and returns it.
    pub async fn remove(&self, id: ProductId) -> DbResult<Product> {
        let product = self
            .mutate("delete product", |products, _| {
                let index = products
                    .iter()
                    .position(|p| p.id == id)
                    .ok_or_else(|| DbError::not_found("Product", id))?;
                Ok(products.remove(index))
            })
            .await?;

        info!(product_id = id, "Product deleted");
        Ok(product)
    }

    /// Re-persists the committed catalog. Called on shutdown.
    pub async fn flush(&self) -> DbResult<()> {
        let state = self.state.lock().await;
        persist_within(
            "flush products",
            self.persist_timeout,
            self.storage.save_products(&state.products),
        )
        .await?;
        debug!(products = state.products.len(), "Catalog flushed");
        Ok(())
    }

    /// Runs one persist-then-commit cycle and publishes the new snapshot.
    ///
    /// `change` works on a copy and receives the next unused id; nothing is
    /// committed unless both `change` and the storage write succeed.
    async fn mutate<T, F>(&self, operation: &'static str, change: F) -> DbResult<T>
    where
        F: FnOnce(&mut Vec<Product>, ProductId) -> DbResult<T>,
    {
        let snapshot;
        let output;
        {
            let mut state = self.state.lock().await;
            let mut next = state.products.clone();
            output = change(&mut next, state.next_id)?;

            if let Err(e) = persist_within(
                operation,
                self.persist_timeout,
                self.storage.save_products(&next),
            )
            .await
            {
                warn!(operation, error = %e, "Catalog write failed; keeping previous state");
                return Err(e);
            }

            if let Some(highest) = next.iter().map(|p| p.id).max() {
                state.next_id = state.next_id.max(highest + 1);
            }
            state.products = next;
            state.revision += 1;
            snapshot = CatalogSnapshot::new(state.revision, state.products.clone());
        }

        debug!(revision = snapshot.revision, "Catalog committed");
        self.sink.publish(snapshot);
        Ok(output)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{FlakyStorage, RecordingSink};
    use storefront_core::{CoreError, NoopSink, SortOrder, ValidationError};

    fn fields(title: &str, price: f64) -> ProductFields {
        ProductFields {
            title: Some(title.into()),
            description: Some("desc".into()),
            code: Some(format!("{}-code", title)),
            price: Some(price),
            status: None,
            stock: Some(10),
            category: Some("general".into()),
            thumbnails: None,
        }
    }

    async fn store(storage: Arc<FlakyStorage>) -> (CatalogStore<FlakyStorage>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let store = CatalogStore::load(storage, sink.clone(), Duration::from_millis(200))
            .await
            .unwrap();
        (store, sink)
    }

    #[tokio::test]
    async fn test_ids_start_at_one_and_follow_max() {
        let (catalog, _) = store(FlakyStorage::with_products(vec![])).await;

        let a = catalog.create(&fields("a", 1.0)).await.unwrap();
        let b = catalog.create(&fields("b", 2.0)).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        catalog.remove(1).await.unwrap();
        let c = catalog.create(&fields("c", 3.0)).await.unwrap();
        assert_eq!(c.id, 3);
    }

    #[tokio::test]
    async fn test_deleting_highest_id_does_not_free_it() {
        let (catalog, _) = store(FlakyStorage::with_products(vec![])).await;

        catalog.create(&fields("a", 1.0)).await.unwrap();
        let b = catalog.create(&fields("b", 2.0)).await.unwrap();
        catalog.remove(b.id).await.unwrap();

        let next = catalog.create(&fields("n", 3.0)).await.unwrap();
        assert!(next.id > b.id, "id {} reused after delete", next.id);
        assert_eq!(next.id, 3);

        // Emptying the catalog keeps the mark too.
        for id in [1, 3] {
            catalog.remove(id).await.unwrap();
        }
        assert_eq!(catalog.create(&fields("z", 1.0)).await.unwrap().id, 4);
    }

    #[tokio::test]
    async fn test_failed_create_does_not_consume_an_id() {
        let storage = FlakyStorage::with_products(vec![]);
        let (catalog, _) = store(storage.clone()).await;

        storage.fail(true);
        assert!(catalog.create(&fields("a", 1.0)).await.is_err());
        storage.fail(false);

        assert_eq!(catalog.create(&fields("a", 1.0)).await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_create_persists_and_publishes() {
        let storage = FlakyStorage::with_products(vec![]);
        let (catalog, sink) = store(storage.clone()).await;

        let created = catalog.create(&fields("tea", 4.0)).await.unwrap();

        assert_eq!(storage.products.lock().unwrap().clone(), vec![created.clone()]);
        assert_eq!(sink.revisions(), vec![1]);
        let published = sink.snapshots.lock().unwrap()[0].products.clone();
        assert_eq!(*published, vec![created]);
    }

    #[tokio::test]
    async fn test_missing_fields_rejected_without_side_effects() {
        let storage = FlakyStorage::with_products(vec![]);
        let (catalog, sink) = store(storage.clone()).await;

        let err = catalog
            .create(&ProductFields {
                price: None,
                ..fields("x", 1.0)
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::MissingFields { .. }))
        ));
        assert!(catalog.all().await.is_empty());
        assert!(sink.revisions().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_untouched() {
        let storage = FlakyStorage::with_products(vec![]);
        let (catalog, sink) = store(storage.clone()).await;
        let kept = catalog.create(&fields("kept", 1.0)).await.unwrap();

        storage.fail(true);
        let err = catalog.create(&fields("lost", 2.0)).await.unwrap_err();
        assert!(matches!(err, DbError::Persistence(_)));
        assert!(catalog.remove(kept.id).await.is_err());

        assert_eq!(catalog.all().await, vec![kept]);
        assert_eq!(sink.revisions(), vec![1]);
    }

    #[tokio::test]
    async fn test_stalled_write_times_out() {
        let storage = FlakyStorage::with_products(vec![]);
        let (catalog, _) = store(storage.clone()).await;

        storage.stall(true);
        let err = catalog.create(&fields("slow", 1.0)).await.unwrap_err();
        assert!(matches!(err, DbError::Timeout { .. }));
        assert!(err.is_retryable());
        assert!(catalog.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_fields_and_defaults_status() {
        let (catalog, _) = store(FlakyStorage::with_products(vec![])).await;
        let created = catalog
            .create(&ProductFields {
                status: Some(false),
                thumbnails: Some(vec!["a.png".into()]),
                ..fields("old", 1.0)
            })
            .await
            .unwrap();

        let updated = catalog
            .update(created.id, &fields("new", 9.0))
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, "new");
        assert!(updated.status);
        assert!(updated.thumbnails.is_empty());

        let missing = catalog.update(42, &fields("x", 1.0)).await.unwrap_err();
        assert!(missing.is_not_found());
    }

    #[tokio::test]
    async fn test_patch_touches_only_given_fields() {
        let (catalog, _) = store(FlakyStorage::with_products(vec![])).await;
        let created = catalog.create(&fields("mate", 3.0)).await.unwrap();

        let patched = catalog
            .patch(
                created.id,
                &ProductFields {
                    stock: Some(99),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.stock, 99);
        assert_eq!(patched.title, "mate");
        assert_eq!(patched.price, 3.0);

        let blanked = catalog
            .patch(
                created.id,
                &ProductFields {
                    title: Some(" ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(blanked.is_validation());
        assert_eq!(catalog.get(created.id).await.unwrap().title, "mate");
    }

    #[tokio::test]
    async fn test_list_sorts_and_paginates() {
        let (catalog, _) = store(FlakyStorage::with_products(vec![])).await;
        for (title, price) in [("a", 30.0), ("b", 10.0), ("c", 20.0)] {
            catalog.create(&fields(title, price)).await.unwrap();
        }

        let query = ListQuery {
            limit: 1,
            page: 2,
            sort: Some(SortOrder::Asc),
            query: None,
        };
        let page = catalog.list(&query).await;
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "c");
        assert!(page.has_prev);
        assert!(page.has_next);
    }

    #[tokio::test]
    async fn test_concurrent_creates_get_distinct_ids() {
        let catalog = Arc::new(
            CatalogStore::load(
                FlakyStorage::with_products(vec![]),
                Arc::new(NoopSink),
                Duration::from_secs(1),
            )
            .await
            .unwrap(),
        );

        let mut handles = Vec::new();
        for i in 0..20 {
            let catalog = catalog.clone();
            handles.push(tokio::spawn(async move {
                catalog.create(&fields(&format!("p{}", i), 1.0)).await.unwrap().id
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=20).collect::<Vec<u64>>());
        assert_eq!(catalog.snapshot().await.revision, 20);
    }

    #[tokio::test]
    async fn test_load_reads_existing_catalog() {
        let existing = Product {
            id: 7,
            title: "seeded".into(),
            description: "d".into(),
            code: "S".into(),
            price: 1.0,
            status: true,
            stock: 1,
            category: "x".into(),
            thumbnails: vec![],
        };
        let (catalog, _) = store(FlakyStorage::with_products(vec![existing.clone()])).await;

        assert_eq!(catalog.get(7).await.unwrap(), existing);
        assert_eq!(catalog.create(&fields("next", 1.0)).await.unwrap().id, 8);
        assert!(catalog.contains(8).await);
    }
}
