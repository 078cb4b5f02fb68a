//! # JSON File Backend
//!
//! Stores each collection as a pretty-printed JSON array:
//!
//! ```text
//! <data_dir>/
//! ├── products.json   [ {"id": 1, "title": ...}, ... ]   catalog order
//! └── carts.json      [ {"id": "…", "products": [...]} ]
//! ```
//!
//! Each write goes to its own temp file in the data directory and is renamed
//! over the target, so a crash mid-write leaves the previous file intact.
//!
//! ## Write Ordering
//! A write abandoned by a persist timeout keeps running on the blocking pool.
//! Every write takes a generation number up front and renames only if no
//! newer generation has been committed, so a late write can never replace a
//! newer file; it just discards its temp file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use storefront_core::{Cart, Product};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::storage::Storage;

const PRODUCTS_FILE: &str = "products.json";
const CARTS_FILE: &str = "carts.json";

/// File-backed storage rooted at a data directory.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
    products: Arc<WriteGate>,
    carts: Arc<WriteGate>,
}

/// Orders the renames of one collection file.
#[derive(Debug, Default)]
struct WriteGate {
    issued: AtomicU64,
    committed: Mutex<u64>,
}

impl WriteGate {
    fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl JsonFileStorage {
    /// Opens (and creates, if needed) the data directory.
    pub async fn open(dir: impl Into<PathBuf>) -> DbResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        info!(dir = %dir.display(), "JSON storage opened");
        Ok(JsonFileStorage {
            dir,
            products: Arc::default(),
            carts: Arc::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn products_path(&self) -> PathBuf {
        self.dir.join(PRODUCTS_FILE)
    }

    pub fn carts_path(&self) -> PathBuf {
        self.dir.join(CARTS_FILE)
    }
}

async fn read_collection<T: DeserializeOwned>(path: &Path) -> DbResult<Vec<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No collection file yet");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    Ok(serde_json::from_slice(&bytes)?)
}

async fn write_collection<T: Serialize>(
    path: &Path,
    gate: &Arc<WriteGate>,
    items: &[T],
) -> DbResult<()> {
    let body = serde_json::to_vec_pretty(items)?;
    let generation = gate.issue();

    let target = path.to_path_buf();
    let gate = gate.clone();
    let written = tokio::task::spawn_blocking(move || commit(&target, &gate, generation, &body))
        .await
        .map_err(|e| DbError::Persistence(format!("Write task failed: {}", e)))??;

    if written {
        debug!(path = %path.display(), records = items.len(), generation, "Collection written");
    }
    Ok(())
}

/// Writes `body` to a fresh temp file and renames it over `target`.
///
/// Returns false when a newer generation was already committed; the temp
/// file is then removed and `target` is left alone.
fn commit(target: &Path, gate: &WriteGate, generation: u64, body: &[u8]) -> DbResult<bool> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let prefix = format!(
        ".{}.",
        target.file_name().and_then(|n| n.to_str()).unwrap_or("collection")
    );

    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(body)?;
    tmp.as_file().sync_all()?;

    let mut committed = gate.committed.lock().unwrap_or_else(|p| p.into_inner());
    if generation < *committed {
        warn!(
            path = %target.display(),
            generation,
            committed = *committed,
            "Discarding superseded write"
        );
        return Ok(false);
    }
    tmp.persist(target).map_err(|e| DbError::from(e.error))?;
    *committed = generation;
    Ok(true)
}

impl Storage for JsonFileStorage {
    async fn load_products(&self) -> DbResult<Vec<Product>> {
        read_collection(&self.products_path()).await
    }

    async fn save_products(&self, products: &[Product]) -> DbResult<()> {
        write_collection(&self.products_path(), &self.products, products).await
    }

    async fn load_carts(&self) -> DbResult<Vec<Cart>> {
        read_collection(&self.carts_path()).await
    }

    async fn save_carts(&self, carts: &[Cart]) -> DbResult<()> {
        write_collection(&self.carts_path(), &self.carts, carts).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;

    fn product(id: u64) -> Product {
        Product {
            id,
            title: format!("P{}", id),
            description: "d".into(),
            code: format!("C{}", id),
            price: 10.0,
            status: true,
            stock: 2,
            category: "x".into(),
            thumbnails: vec!["a.png".into()],
        }
    }

    #[tokio::test]
    async fn test_missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::open(dir.path().join("data")).await.unwrap();

        assert!(storage.load_products().await.unwrap().is_empty());
        assert!(storage.load_carts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_products_survive_reopen_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::open(dir.path()).await.unwrap();
        storage
            .save_products(&[product(3), product(1)])
            .await
            .unwrap();

        let reopened = JsonFileStorage::open(dir.path()).await.unwrap();
        let ids: Vec<u64> = reopened
            .load_products()
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![3, 1]);

        let raw = std::fs::read_to_string(storage.products_path()).unwrap();
        assert!(raw.contains("\n  {"), "file should be pretty-printed");
        assert_eq!(data_files(dir.path()), vec!["products.json".to_string()]);
    }

    #[tokio::test]
    async fn test_carts_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::open(dir.path()).await.unwrap();

        let mut cart = Cart::new("c1");
        cart.add_product(3, 2).unwrap();
        storage.save_carts(&[cart.clone()]).await.unwrap();

        assert_eq!(storage.load_carts().await.unwrap(), vec![cart]);
    }

    fn data_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_late_write_cannot_replace_newer_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::open(dir.path()).await.unwrap();
        let path = storage.products_path();

        // A write that stalled past its timeout finishes after the next one.
        let stale = storage.products.issue();
        let fresh = storage.products.issue();
        let fresh_body = serde_json::to_vec_pretty(&[product(1), product(2)]).unwrap();
        let stale_body = serde_json::to_vec_pretty(&[product(1)]).unwrap();

        assert!(commit(&path, &storage.products, fresh, &fresh_body).unwrap());
        assert!(!commit(&path, &storage.products, stale, &stale_body).unwrap());

        let ids: Vec<u64> = storage
            .load_products()
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(data_files(dir.path()), vec!["products.json".to_string()]);

        // The next regular write still lands.
        storage.save_products(&[product(3)]).await.unwrap();
        assert_eq!(storage.load_products().await.unwrap(), vec![product(3)]);
    }

    #[tokio::test]
    async fn test_collections_are_gated_independently() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::open(dir.path()).await.unwrap();

        storage.save_products(&[product(1)]).await.unwrap();
        storage.save_products(&[product(2)]).await.unwrap();
        storage.save_carts(&[Cart::new("c1")]).await.unwrap();

        assert_eq!(storage.load_products().await.unwrap(), vec![product(2)]);
        assert_eq!(storage.load_carts().await.unwrap().len(), 1);
        assert_eq!(
            data_files(dir.path()),
            vec!["carts.json".to_string(), "products.json".to_string()]
        );
    }

    #[tokio::test]
    async fn test_corrupt_file_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::open(dir.path()).await.unwrap();
        std::fs::write(storage.products_path(), "{not json").unwrap();

        let err = storage.load_products().await.unwrap_err();
        assert!(matches!(err, DbError::Persistence(_)));
    }
}
