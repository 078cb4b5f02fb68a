//! # SQLite Document Backend
//!
//! Keeps one JSON document per record:
//!
//! ```text
//! products(id INTEGER PK, position INTEGER, document TEXT)
//! carts   (id TEXT PK,    position INTEGER, document TEXT)
//! ```
//!
//! A save rewrites the whole table inside one transaction, so readers see
//! either the old collection or the new one.

use serde::de::DeserializeOwned;
use sqlx::Row;
use storefront_core::{Cart, Product};
use tracing::debug;

use crate::error::DbResult;
use crate::pool::Database;
use crate::storage::Storage;

/// SQLite-backed storage.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    db: Database,
}

impl SqliteStorage {
    pub fn new(db: Database) -> Self {
        SqliteStorage { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    async fn load_documents<T: DeserializeOwned>(&self, sql: &'static str) -> DbResult<Vec<T>> {
        let rows = sqlx::query(sql).fetch_all(self.db.pool()).await?;

        rows.iter()
            .map(|row| -> DbResult<T> {
                let document: String = row.try_get("document")?;
                Ok(serde_json::from_str(&document)?)
            })
            .collect()
    }
}

impl Storage for SqliteStorage {
    async fn load_products(&self) -> DbResult<Vec<Product>> {
        self.load_documents("SELECT document FROM products ORDER BY position")
            .await
    }

    async fn save_products(&self, products: &[Product]) -> DbResult<()> {
        let mut tx = self.db.pool().begin().await?;

        sqlx::query("DELETE FROM products").execute(&mut *tx).await?;
        for (position, product) in products.iter().enumerate() {
            let document = serde_json::to_string(product)?;
            sqlx::query("INSERT INTO products (id, position, document) VALUES (?, ?, ?)")
                .bind(product.id as i64)
                .bind(position as i64)
                .bind(document)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(records = products.len(), "Products table rewritten");
        Ok(())
    }

    async fn load_carts(&self) -> DbResult<Vec<Cart>> {
        self.load_documents("SELECT document FROM carts ORDER BY position")
            .await
    }

    async fn save_carts(&self, carts: &[Cart]) -> DbResult<()> {
        let mut tx = self.db.pool().begin().await?;

        sqlx::query("DELETE FROM carts").execute(&mut *tx).await?;
        for (position, cart) in carts.iter().enumerate() {
            let document = serde_json::to_string(cart)?;
            sqlx::query("INSERT INTO carts (id, position, document) VALUES (?, ?, ?)")
                .bind(&cart.id)
                .bind(position as i64)
                .bind(document)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(records = carts.len(), "Carts table rewritten");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
