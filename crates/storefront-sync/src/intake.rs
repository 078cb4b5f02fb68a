//! # Product Intake
//!
//! Consumes `newProduct` submissions from push clients and feeds them to the
//! catalog. There is no reply to the submitter: a successful create reaches
//! every client (the submitter included) as the next `updateProducts`, and a
//! rejected one is only logged.

use std::sync::Arc;

use storefront_core::{Product, ProductFields};
use storefront_db::{CatalogStore, Storage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::SyncResult;
use crate::hub::SubscriberId;

/// Default depth of the submission queue between sockets and the intake.
pub const DEFAULT_INTAKE_CAPACITY: usize = 64;

/// One `newProduct` event, tagged with the socket it came from.
#[derive(Debug, Clone)]
pub struct Submission {
    pub subscriber: SubscriberId,
    pub fields: ProductFields,
}

/// Runs catalog creates for push submissions.
pub struct ProductIntake<S> {
    catalog: Arc<CatalogStore<S>>,
}

impl<S: Storage> ProductIntake<S> {
    pub fn new(catalog: Arc<CatalogStore<S>>) -> Self {
        ProductIntake { catalog }
    }

    /// Spawns the intake loop.
    ///
    /// The loop ends once every sender is dropped. The hub holds a sender and
    /// the catalog usually holds the hub as its sink, so servers abort the
    /// returned handle on shutdown.
    pub fn start(self, submissions: mpsc::Receiver<Submission>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(submissions).await })
    }

    async fn run(self, mut submissions: mpsc::Receiver<Submission>) {
        info!("Product intake started");
        while let Some(submission) = submissions.recv().await {
            let subscriber = submission.subscriber;
            match self.handle(submission).await {
                Ok(product) => {
                    info!(subscriber = %subscriber, product_id = product.id, "Pushed product accepted")
                }
                Err(e) if e.is_rejection() => {
                    warn!(subscriber = %subscriber, error = %e, "Pushed product rejected")
                }
                Err(e) => {
                    error!(subscriber = %subscriber, error = %e, "Pushed product could not be stored")
                }
            }
        }
        info!("Product intake stopped");
    }

    /// Creates the submitted product.
    pub async fn handle(&self, submission: Submission) -> SyncResult<Product> {
        Ok(self.catalog.create(&submission.fields).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{HubConfig, SyncHub};
    use std::time::Duration;
    use storefront_db::JsonFileStorage;
    use uuid::Uuid;

    fn valid_fields(title: &str) -> ProductFields {
        ProductFields {
            title: Some(title.into()),
            description: Some("d".into()),
            code: Some("c".into()),
            price: Some(5.0),
            stock: Some(2),
            category: Some("x".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_valid_submission_reaches_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(JsonFileStorage::open(dir.path()).await.unwrap());
        let (intake_tx, intake_rx) = mpsc::channel(DEFAULT_INTAKE_CAPACITY);
        let hub = Arc::new(SyncHub::new(HubConfig::default(), intake_tx));
        let catalog = Arc::new(
            CatalogStore::load(storage, hub.clone(), Duration::from_secs(1))
                .await
                .unwrap(),
        );
        let handle = ProductIntake::new(catalog.clone()).start(intake_rx);

        let mut sub = hub.subscribe();
        let id = sub.id;
        hub.submit(id, ProductFields::default()).await.unwrap();
        hub.submit(id, valid_fields("ok")).await.unwrap();

        let snapshot = tokio::time::timeout(Duration::from_secs(2), sub.receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.revision, 1);
        assert_eq!(snapshot.products.len(), 1);
        assert_eq!(snapshot.products[0].title, "ok");
        assert_eq!(catalog.all().await.len(), 1);
        assert!(sub.receiver.try_recv().is_err());

        handle.abort();
    }

    #[tokio::test]
    async fn test_handle_reports_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(JsonFileStorage::open(dir.path()).await.unwrap());
        let catalog = Arc::new(
            CatalogStore::load(
                storage,
                Arc::new(storefront_core::NoopSink),
                Duration::from_secs(1),
            )
            .await
            .unwrap(),
        );
        let intake = ProductIntake::new(catalog);

        let err = intake
            .handle(Submission {
                subscriber: Uuid::new_v4(),
                fields: ProductFields::default(),
            })
            .await
            .unwrap_err();
        assert!(err.is_rejection());
    }
}
