//! # storefront-core: Pure Domain Logic for the Storefront
//!
//! Everything the storefront knows about products, carts and catalog
//! queries, expressed as plain data and pure functions.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────┐   ┌─────────────────────────────┐     │
//! │  │  HTTP routes (apps/server)  │   │  /ws push channel (sync)    │     │
//! │  └──────────────┬──────────────┘   └──────────────┬──────────────┘     │
//! │                 │                                 │                     │
//! │  ┌──────────────▼─────────────────────────────────▼──────────────┐     │
//! │  │             storefront-db (CatalogStore, CartStore)           │     │
//! │  └──────────────────────────────┬────────────────────────────────┘     │
//! │                                 │                                       │
//! │  ┌──────────────────────────────▼────────────────────────────────┐     │
//! │  │              ★ storefront-core (THIS CRATE) ★                  │     │
//! │  │                                                                │     │
//! │  │   ┌───────────┐  ┌────────────┐  ┌───────────┐  ┌──────────┐  │     │
//! │  │   │   types   │  │ validation │  │   query   │  │  change  │  │     │
//! │  │   │  Product  │  │  required  │  │  filter   │  │  sink    │  │     │
//! │  │   │   Cart    │  │  fields    │  │  paginate │  │ snapshot │  │     │
//! │  │   └───────────┘  └────────────┘  └───────────┘  └──────────┘  │     │
//! │  │                                                                │     │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS          │     │
//! │  └────────────────────────────────────────────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, ProductFields, Cart, LineItem)
//! - [`validation`] - Required-field and quantity rules
//! - [`query`] - Catalog filtering, sorting and pagination
//! - [`change`] - Catalog snapshots and the sink that receives them
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use storefront_core::query::{run_query, ListQuery};
//! use storefront_core::{validation::validate_product_fields, ProductFields};
//!
//! let fields = ProductFields {
//!     title: Some("A".into()),
//!     description: Some("d".into()),
//!     code: Some("c1".into()),
//!     price: Some(10.0),
//!     stock: Some(5),
//!     category: Some("x".into()),
//!     ..Default::default()
//! };
//! let product = validate_product_fields(&fields).unwrap().into_product(1);
//!
//! let query = ListQuery::from_params(Some(1), Some(1), Some("asc"), None).unwrap();
//! let page = run_query(&[product], &query);
//! assert_eq!(page.items.len(), 1);
//! assert!(!page.has_next);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod change;
pub mod error;
pub mod query;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use change::{CatalogSnapshot, ChangeSink, NoopSink};
pub use error::{CoreError, CoreResult, ValidationError};
pub use query::{CatalogFilter, ListQuery, Page, SortOrder};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Page size used when the caller does not send `limit`.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Largest page a caller may request; larger values are clamped.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Maximum distinct line items allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: u32 = 999;
