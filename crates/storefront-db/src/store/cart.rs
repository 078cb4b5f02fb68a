//! # Cart Store
//!
//! Owns the cart collection. Product references are checked against the
//! catalog at write time; views resolve them at read time and skip any that
//! have since been deleted.

use std::sync::Arc;
use std::time::Duration;

use storefront_core::validation::{validate_cart_id, validate_quantity};
use storefront_core::{Cart, CartView, LineItem, ProductId};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::storage::Storage;
use crate::store::catalog::CatalogStore;
use crate::store::persist_within;

/// Shopping carts, backed by the same [`Storage`] as the catalog.
pub struct CartStore<S> {
    storage: Arc<S>,
    catalog: Arc<CatalogStore<S>>,
    carts: Mutex<Vec<Cart>>,
    persist_timeout: Duration,
}

impl<S: Storage> CartStore<S> {
    pub async fn load(
        storage: Arc<S>,
        catalog: Arc<CatalogStore<S>>,
        persist_timeout: Duration,
    ) -> DbResult<Self> {
        let carts = storage.load_carts().await?;
        info!(carts = carts.len(), "Carts loaded");

        Ok(CartStore {
            storage,
            catalog,
            carts: Mutex::new(carts),
            persist_timeout,
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn list(&self) -> Vec<Cart> {
        self.carts.lock().await.clone()
    }

    pub async fn get(&self, cart_id: &str) -> DbResult<Cart> {
        self.carts
            .lock()
            .await
            .iter()
            .find(|c| c.id == cart_id)
            .cloned()
            .ok_or_else(|| DbError::not_found("Cart", cart_id))
    }

    /// The cart with every line resolved against the current catalog.
    pub async fn view(&self, cart_id: &str) -> DbResult<CartView> {
        let cart = self.get(cart_id).await?;
        let products = self.catalog.all().await;

        Ok(cart.resolve(|id| products.iter().find(|p| p.id == id).cloned()))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Creates an empty cart with a generated id.
    pub async fn create(&self) -> DbResult<Cart> {
        let cart = self
            .mutate("create cart", |carts| {
                let cart = Cart::with_generated_id();
                carts.push(cart.clone());
                Ok(cart)
            })
            .await?;

        info!(cart_id = %cart.id, "Cart created");
        Ok(cart)
    }

    /// Adds one unit of a product.
    ///
    /// Both the cart and the product must exist.
    pub async fn add_product(&self, cart_id: &str, product_id: ProductId) -> DbResult<Cart> {
        if !self.catalog.contains(product_id).await {
            return Err(DbError::not_found("Product", product_id));
        }

        let cart = self
            .mutate("add to cart", |carts| {
                let cart = find_mut(carts, cart_id)?;
                cart.add_product(product_id, 1)?;
                Ok(cart.clone())
            })
            .await?;

        debug!(cart_id, product_id, "Product added to cart");
        Ok(cart)
    }

    /// Sets the quantity of one line.
    ///
    /// An unknown cart id creates the cart under that id.
    pub async fn set_quantity(
        &self,
        cart_id: &str,
        product_id: ProductId,
        quantity: i64,
    ) -> DbResult<Cart> {
        validate_quantity(quantity)?;
        if !self.catalog.contains(product_id).await {
            return Err(DbError::not_found("Product", product_id));
        }

        let cart = self
            .mutate("set cart quantity", |carts| {
                let index = match carts.iter().position(|c| c.id == cart_id) {
                    Some(index) => index,
                    None => {
                        validate_cart_id(cart_id)?;
                        info!(cart_id, "Cart created implicitly");
                        carts.push(Cart::new(cart_id));
                        carts.len() - 1
                    }
                };
                let cart = &mut carts[index];
                cart.set_quantity(product_id, quantity as u32)?;
                Ok(cart.clone())
            })
            .await?;

        debug!(cart_id, product_id, quantity, "Cart quantity set");
        Ok(cart)
    }

    /// Replaces every line of a cart. Duplicate product ids are merged.
    pub async fn replace_products(&self, cart_id: &str, lines: Vec<LineItem>) -> DbResult<Cart> {
        for line in &lines {
            if !self.catalog.contains(line.product_id).await {
                return Err(DbError::not_found("Product", line.product_id));
            }
        }

        let cart = self
            .mutate("replace cart", |carts| {
                let cart = find_mut(carts, cart_id)?;
                cart.replace_products(lines)?;
                Ok(cart.clone())
            })
            .await?;

        debug!(cart_id, lines = cart.products.len(), "Cart lines replaced");
        Ok(cart)
    }

    /// Removes one product line.
    pub async fn remove_product(&self, cart_id: &str, product_id: ProductId) -> DbResult<Cart> {
        let cart = self
            .mutate("remove from cart", |carts| {
                let cart = find_mut(carts, cart_id)?;
                if !cart.remove_product(product_id) {
                    return Err(DbError::not_found(
                        "Cart line",
                        format!("{}/{}", cart_id, product_id),
                    ));
                }
                Ok(cart.clone())
            })
            .await?;

        debug!(cart_id, product_id, "Product removed from cart");
        Ok(cart)
    }

    /// Deletes a cart and returns it.
    pub async fn remove(&self, cart_id: &str) -> DbResult<Cart> {
        let cart = self
            .mutate("delete cart", |carts| {
                let index = carts
                    .iter()
                    .position(|c| c.id == cart_id)
                    .ok_or_else(|| DbError::not_found("Cart", cart_id))?;
                Ok(carts.remove(index))
            })
            .await?;

        info!(cart_id, "Cart deleted");
        Ok(cart)
    }

    /// Drops every line that references `product_id`. Returns the number of
    /// carts changed; nothing is written when that is zero.
    pub async fn purge_product(&self, product_id: ProductId) -> DbResult<usize> {
        let mut carts = self.carts.lock().await;
        let mut next = carts.clone();
        let touched = next
            .iter_mut()
            .map(|cart| cart.remove_product(product_id))
            .filter(|removed| *removed)
            .count();

        if touched == 0 {
            return Ok(0);
        }

        persist_within(
            "purge product from carts",
            self.persist_timeout,
            self.storage.save_carts(&next),
        )
        .await?;
        *carts = next;

        info!(product_id, carts = touched, "Deleted product purged from carts");
        Ok(touched)
    }

    /// Re-persists the committed carts. Called on shutdown.
    pub async fn flush(&self) -> DbResult<()> {
        let carts = self.carts.lock().await;
        persist_within(
            "flush carts",
            self.persist_timeout,
            self.storage.save_carts(&carts),
        )
        .await?;
        debug!(carts = carts.len(), "Carts flushed");
        Ok(())
    }

    async fn mutate<T, F>(&self, operation: &'static str, change: F) -> DbResult<T>
    where
        F: FnOnce(&mut Vec<Cart>) -> DbResult<T>,
    {
        let mut carts = self.carts.lock().await;
        let mut next = carts.clone();
        let output = change(&mut next)?;

        if let Err(e) = persist_within(
            operation,
            self.persist_timeout,
            self.storage.save_carts(&next),
        )
        .await
        {
            warn!(operation, error = %e, "Cart write failed; keeping previous state");
            return Err(e);
        }

        *carts = next;
        Ok(output)
    }
}

fn find_mut<'a>(carts: &'a mut [Cart], cart_id: &str) -> DbResult<&'a mut Cart> {
    carts
        .iter_mut()
        .find(|c| c.id == cart_id)
        .ok_or_else(|| DbError::not_found("Cart", cart_id))
}

// =============================================================================
// Unit Tests
// =============================================================================
