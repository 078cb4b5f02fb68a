//! # Push Protocol
//!
//! Events exchanged over `/ws`.
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Push Events                                      │
//! │                                                                         │
//! │  ON CONNECT                                                            │
//! │  SERVER ───► updateProducts [ ...current catalog... ]                  │
//! │                                                                         │
//! │  AFTER EVERY CATALOG MUTATION (any client, any transport)              │
//! │  SERVER ───► updateProducts [ ...full catalog... ]    (all clients)    │
//! │                                                                         │
//! │  SUBMISSION                                                            │
//! │  CLIENT ───► newProduct { title, description, code, price, ... }       │
//! │              (no reply; the resulting updateProducts is the ack)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Adjacently tagged JSON text frames:
//! ```json
//! { "event": "updateProducts", "data": [ { "id": 1, "title": "..." } ] }
//! ```

use serde::{Deserialize, Serialize};
use storefront_core::{Product, ProductFields};
use ts_rs::TS;

use crate::error::{SyncError, SyncResult};

/// Every event that travels over the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
#[ts(export)]
pub enum PushEvent {
    /// Full catalog, server to client.
    UpdateProducts(Vec<Product>),

    /// Product submission, client to server.
    NewProduct(ProductFields),
}

/// Borrowed form of `updateProducts` so a snapshot can be encoded without
/// cloning the catalog.
#[derive(Serialize)]
struct UpdateProductsRef<'a> {
    event: &'static str,
    data: &'a [Product],
}

/// Encodes an `updateProducts` frame.
pub fn encode_update(products: &[Product]) -> SyncResult<String> {
    serde_json::to_string(&UpdateProductsRef {
        event: "updateProducts",
        data: products,
    })
    .map_err(|e| SyncError::SerializationFailed(e.to_string()))
}

/// Decodes an inbound text frame.
pub fn decode(text: &str) -> SyncResult<PushEvent> {
    serde_json::from_str(text).map_err(|e| SyncError::InvalidMessage(e.to_string()))
}
