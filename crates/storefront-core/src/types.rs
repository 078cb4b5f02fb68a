//! # Domain Types
//!
//! Core domain types used throughout the storefront.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  ProductFields  │   │      Cart       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (u64)       │   │  every field    │   │  id (string)    │       │
//! │  │  title, code    │   │  optional, the  │   │  products: [    │       │
//! │  │  price, stock   │   │  raw inbound    │   │    LineItem ]   │       │
//! │  │  status, ...    │   │  payload        │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ProductFields ──validate──► ProductDraft ──assign id──► Product        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Wire names are camelCase so the JSON matches what browser clients send.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::validation::{validate_cart_size, validate_quantity};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Catalog identifier. Assigned as `max(existing) + 1`, starting at 1.
pub type ProductId = u64;

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Unique, immutable identifier.
    #[ts(type = "number")]
    pub id: ProductId,

    pub title: String,

    pub description: String,

    /// Merchant code. Named like a SKU but not enforced unique.
    pub code: String,

    /// Unit price, always positive.
    pub price: f64,

    /// Whether the product is offered for sale.
    pub status: bool,

    /// Units on hand.
    #[ts(type = "number")]
    pub stock: u64,

    pub category: String,

    /// Image URLs, in display order.
    #[serde(default)]
    pub thumbnails: Vec<String>,
}

impl Product {
    /// Checks if the product is both enabled and in stock.
    pub fn is_available(&self) -> bool {
        self.status && self.stock > 0
    }
}

// =============================================================================
// Product Fields (inbound payload)
// =============================================================================

/// The fields a client sends to create, replace or patch a product.
///
/// Every field is optional at the type level so that a missing field becomes
/// a [`ValidationError`](crate::ValidationError) naming it, instead of an
/// opaque deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    pub price: Option<f64>,
    pub status: Option<bool>,
    #[ts(type = "number | null")]
    pub stock: Option<u64>,
    pub category: Option<String>,
    pub thumbnails: Option<Vec<String>>,
}

impl ProductFields {
    /// Overlays these fields on an existing product.
    ///
    /// Fields present here win; absent fields are taken from `base`.
    /// The result is a complete payload ready for validation.
    pub fn overlay(&self, base: &Product) -> ProductFields {
        ProductFields {
            title: self.title.clone().or_else(|| Some(base.title.clone())),
            description: self
                .description
                .clone()
                .or_else(|| Some(base.description.clone())),
            code: self.code.clone().or_else(|| Some(base.code.clone())),
            price: self.price.or(Some(base.price)),
            status: self.status.or(Some(base.status)),
            stock: self.stock.or(Some(base.stock)),
            category: self.category.clone().or_else(|| Some(base.category.clone())),
            thumbnails: self
                .thumbnails
                .clone()
                .or_else(|| Some(base.thumbnails.clone())),
        }
    }
}

/// A validated product that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub title: String,
    pub description: String,
    pub code: String,
    pub price: f64,
    pub status: bool,
    pub stock: u64,
    pub category: String,
    pub thumbnails: Vec<String>,
}

impl ProductDraft {
    /// Materializes the draft under the given id.
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            title: self.title,
            description: self.description,
            code: self.code,
            price: self.price,
            status: self.status,
            stock: self.stock,
            category: self.category,
            thumbnails: self.thumbnails,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One product line inside a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineItem {
    #[ts(type = "number")]
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A shopping cart.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product increases quantity)
/// - Every quantity is in `1..=MAX_ITEM_QUANTITY`
/// - At most `MAX_CART_ITEMS` lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Cart {
    pub id: String,

    pub products: Vec<LineItem>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Cart {
            id: id.into(),
            products: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an empty cart with a fresh UUID v4 id.
    pub fn with_generated_id() -> Self {
        Cart::new(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the quantity held for a product, if any.
    pub fn quantity_of(&self, product_id: ProductId) -> Option<u32> {
        self.products
            .iter()
            .find(|line| line.product_id == product_id)
            .map(|line| line.quantity)
    }

    /// Adds `quantity` units of a product, merging into an existing line.
    pub fn add_product(&mut self, product_id: ProductId, quantity: u32) -> CoreResult<()> {
        validate_quantity(quantity as i64)?;

        if let Some(line) = self.products.iter_mut().find(|l| l.product_id == product_id) {
            let requested = line.quantity as u64 + quantity as u64;
            if requested > MAX_ITEM_QUANTITY as u64 {
                return Err(CoreError::QuantityTooLarge {
                    requested,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            line.quantity = requested as u32;
        } else {
            if validate_cart_size(self.products.len()).is_err() {
                return Err(CoreError::CartTooLarge {
                    max: MAX_CART_ITEMS,
                });
            }
            self.products.push(LineItem {
                product_id,
                quantity,
            });
        }

        self.touch();
        Ok(())
    }

    /// Sets the quantity of a product line, inserting the line if needed.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> CoreResult<()> {
        validate_quantity(quantity as i64)?;

        if let Some(line) = self.products.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity;
        } else {
            if validate_cart_size(self.products.len()).is_err() {
                return Err(CoreError::CartTooLarge {
                    max: MAX_CART_ITEMS,
                });
            }
            self.products.push(LineItem {
                product_id,
                quantity,
            });
        }

        self.touch();
        Ok(())
    }

    /// Replaces every line. Duplicate product ids are merged by summing.
    pub fn replace_products(&mut self, lines: Vec<LineItem>) -> CoreResult<()> {
        let mut merged = Cart::new(self.id.clone());
        for line in lines {
            merged.add_product(line.product_id, line.quantity)?;
        }
        self.products = merged.products;
        self.touch();
        Ok(())
    }

    /// Removes a product line. Returns false when the line did not exist.
    pub fn remove_product(&mut self, product_id: ProductId) -> bool {
        let before = self.products.len();
        self.products.retain(|line| line.product_id != product_id);
        let removed = self.products.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Total number of units across all lines.
    pub fn total_units(&self) -> u64 {
        self.products.iter().map(|l| l.quantity as u64).sum()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// =============================================================================
// Cart View
// =============================================================================

/// A cart line with its product resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLineView {
    pub product: Product,
    pub quantity: u32,
    pub subtotal: f64,
}

/// A cart as shown to clients: resolved products plus the running total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartView {
    pub id: String,
    pub products: Vec<CartLineView>,
    pub total: f64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Resolves every line through `lookup`.
    ///
    /// Lines whose product no longer exists are skipped.
    pub fn resolve<F>(&self, lookup: F) -> CartView
    where
        F: Fn(ProductId) -> Option<Product>,
    {
        let products: Vec<CartLineView> = self
            .products
            .iter()
            .filter_map(|line| {
                lookup(line.product_id).map(|product| CartLineView {
                    subtotal: product.price * line.quantity as f64,
                    product,
                    quantity: line.quantity,
                })
            })
            .collect();
        let total = products.iter().map(|l| l.subtotal).sum();

        CartView {
            id: self.id.clone(),
            products,
            total,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
