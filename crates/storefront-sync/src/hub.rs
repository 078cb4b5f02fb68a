//! # Sync Hub
//!
//! Subscriber registry and fan-out for catalog snapshots, plus the `/ws`
//! endpoint that connects browsers to it.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SyncHub                                        │
//! │                                                                         │
//! │  CatalogStore ──publish(snapshot)──►  registry (std Mutex)              │
//! │                                       ├── latest snapshot               │
//! │                                       └── id → mpsc::Sender (bounded)   │
//! │                                              │ try_send                 │
//! │                    ┌─────────────────────────┼──────────────────┐       │
//! │                    ▼                         ▼                  ▼       │
//! │             ┌────────────┐            ┌────────────┐     ┌────────────┐ │
//! │             │ socket #1  │            │ socket #2  │     │ socket #3  │ │
//! │             │ forwarder  │            │ forwarder  │     │ (closed →  │ │
//! │             │   task     │            │   task     │     │  pruned)   │ │
//! │             └────────────┘            └────────────┘     └────────────┘ │
//! │                                                                         │
//! │  inbound newProduct ──intake_tx──► ProductIntake                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Delivery Rules
//! - `publish` never blocks and never fails: a full queue drops that one
//!   event for that one subscriber, a closed queue removes the subscriber.
//! - Snapshots whose revision is not newer than the last published one are
//!   discarded, so no subscriber sees the catalog move backwards.
//! - A new subscriber is primed with the latest snapshot under the same lock
//!   that `publish` takes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use storefront_core::{CatalogSnapshot, ChangeSink, ProductFields};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::intake::Submission;
use crate::protocol::{self, PushEvent};

// =============================================================================
// Constants
// =============================================================================

/// Default per-subscriber queue depth.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 32;

/// Default ping interval to keep connections alive.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum inbound message size (1MB).
const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Depth of the per-socket outgoing frame queue.
const OUTGOING_QUEUE: usize = 64;

// =============================================================================
// Hub Configuration
// =============================================================================

/// Configuration for the hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Snapshots buffered per subscriber before events are dropped.
    pub subscriber_capacity: usize,
    /// Interval between server pings on each socket.
    pub ping_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        HubConfig {
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            ping_interval: DEFAULT_PING_INTERVAL,
        }
    }
}

// =============================================================================
// Subscription
// =============================================================================

pub type SubscriberId = Uuid;

/// A registered subscriber's end of the fan-out.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<CatalogSnapshot>,
}

#[derive(Default)]
struct Registry {
    subscribers: HashMap<SubscriberId, mpsc::Sender<CatalogSnapshot>>,
    latest: Option<CatalogSnapshot>,
}

// =============================================================================
// Sync Hub
// =============================================================================

/// Fans catalog snapshots out to every connected subscriber.
pub struct SyncHub {
    config: HubConfig,
    registry: Mutex<Registry>,
    intake_tx: mpsc::Sender<Submission>,
}

impl SyncHub {
    /// Creates a hub. Inbound `newProduct` events are forwarded to `intake_tx`.
    pub fn new(config: HubConfig, intake_tx: mpsc::Sender<Submission>) -> Self {
        SyncHub {
            config,
            registry: Mutex::new(Registry::default()),
            intake_tx,
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // Registry updates are single assignments; a poisoned lock still
        // holds a consistent map.
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a subscriber, primed with the latest snapshot if any.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.config.subscriber_capacity.max(1));
        let id = Uuid::new_v4();

        let mut registry = self.registry();
        if let Some(latest) = &registry.latest {
            let _ = tx.try_send(latest.clone());
        }
        registry.subscribers.insert(id, tx);
        debug!(subscriber = %id, total = registry.subscribers.len(), "Subscriber registered");

        Subscription { id, receiver: rx }
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut registry = self.registry();
        if registry.subscribers.remove(&id).is_some() {
            debug!(subscriber = %id, total = registry.subscribers.len(), "Subscriber removed");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry().subscribers.len()
    }

    /// Revision of the last snapshot accepted by `publish`.
    pub fn latest_revision(&self) -> Option<u64> {
        self.registry().latest.as_ref().map(|s| s.revision)
    }

    /// Delivers a snapshot to every subscriber without blocking.
    pub fn publish(&self, snapshot: CatalogSnapshot) {
        let mut registry = self.registry();

        if let Some(latest) = &registry.latest {
            if snapshot.revision <= latest.revision {
                debug!(
                    revision = snapshot.revision,
                    latest = latest.revision,
                    "Discarding stale snapshot"
                );
                return;
            }
        }

        let mut closed = Vec::new();
        for (id, tx) in registry.subscribers.iter() {
            match tx.try_send(snapshot.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(subscriber = %id, revision = snapshot.revision, "Subscriber queue full; event dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }
        for id in closed {
            registry.subscribers.remove(&id);
            debug!(subscriber = %id, "Pruned closed subscriber");
        }

        debug!(
            revision = snapshot.revision,
            subscribers = registry.subscribers.len(),
            "Snapshot published"
        );
        registry.latest = Some(snapshot);
    }

    /// Forwards a product submission to the intake task.
    pub async fn submit(&self, subscriber: SubscriberId, fields: ProductFields) -> SyncResult<()> {
        self.intake_tx
            .send(Submission { subscriber, fields })
            .await
            .map_err(|_| SyncError::ChannelError("Intake channel closed".into()))
    }

    /// The `/ws` route, ready to merge into any router.
    pub fn routes<S>(self: &Arc<Self>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        Router::new()
            .route("/ws", get(ws_handler))
            .with_state(self.clone())
    }
}

impl ChangeSink for SyncHub {
    fn publish(&self, snapshot: CatalogSnapshot) {
        SyncHub::publish(self, snapshot)
    }
}

// =============================================================================
// WebSocket Handler
// =============================================================================

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Arc<SyncHub>>) -> impl IntoResponse {
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Drives one connection until either side closes it.
async fn handle_socket(socket: WebSocket, hub: Arc<SyncHub>) {
    let Subscription {
        id,
        receiver: mut snapshots,
    } = hub.subscribe();
    info!(subscriber = %id, "Push client connected");

    let (mut sender, mut receiver) = socket.split();
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(OUTGOING_QUEUE);

    // Outgoing message task
    let outgoing_handle = tokio::spawn(async move {
        while let Some(msg) = outgoing_rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Snapshot forwarding task
    let outgoing_tx_snapshots = outgoing_tx.clone();
    let forward_handle = tokio::spawn(async move {
        while let Some(snapshot) = snapshots.recv().await {
            match protocol::encode_update(&snapshot.products) {
                Ok(text) => {
                    if outgoing_tx_snapshots
                        .send(Message::Text(text.into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => warn!(subscriber = %id, error = %e, "Failed to encode snapshot"),
            }
        }
    });

    // Ping task
    let outgoing_tx_ping = outgoing_tx.clone();
    let ping_every = hub.config.ping_interval;
    let ping_handle = tokio::spawn(async move {
        let mut ticker = interval(ping_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if outgoing_tx_ping
                .send(Message::Ping(axum::body::Bytes::new()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Main receive loop
    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => handle_frame(&hub, id, text.as_str()).await,
            Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                Ok(text) => handle_frame(&hub, id, text).await,
                Err(_) => debug!(subscriber = %id, "Ignoring non UTF-8 binary frame"),
            },
            Some(Ok(Message::Ping(data))) => {
                let _ = outgoing_tx.send(Message::Pong(data)).await;
            }
            Some(Ok(Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) => {
                info!(subscriber = %id, "Push client requested close");
                break;
            }
            Some(Err(e)) => {
                warn!(subscriber = %id, error = %e, "WebSocket error");
                break;
            }
            None => {
                info!(subscriber = %id, "Push client disconnected");
                break;
            }
        }
    }

    // Cleanup
    hub.unsubscribe(id);
    ping_handle.abort();
    forward_handle.abort();
    outgoing_handle.abort();
}

/// Handles one inbound frame. Invalid frames are logged and ignored.
async fn handle_frame(hub: &SyncHub, id: SubscriberId, text: &str) {
    match protocol::decode(text) {
        Ok(PushEvent::NewProduct(fields)) => {
            debug!(subscriber = %id, "newProduct received");
            if let Err(e) = hub.submit(id, fields).await {
                warn!(subscriber = %id, error = %e, "Failed to forward submission");
            }
        }
        Ok(PushEvent::UpdateProducts(_)) => {
            debug!(subscriber = %id, "Ignoring client-sent updateProducts");
        }
        Err(e) => {
            debug!(subscriber = %id, error = %e, "Invalid message format");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::Product;

    fn product(id: u64) -> Product {
        Product {
            id,
            title: format!("P{}", id),
            description: "d".into(),
            code: format!("C{}", id),
            price: 1.0,
            status: true,
            stock: 1,
            category: "x".into(),
            thumbnails: vec![],
        }
    }

    fn snapshot(revision: u64) -> CatalogSnapshot {
        CatalogSnapshot::new(revision, (1..=revision).map(product).collect())
    }

    fn hub(capacity: usize) -> (Arc<SyncHub>, mpsc::Receiver<Submission>) {
        let (tx, rx) = mpsc::channel(8);
        let config = HubConfig {
            subscriber_capacity: capacity,
            ..HubConfig::default()
        };
        (Arc::new(SyncHub::new(config, tx)), rx)
    }

    #[tokio::test]
    async fn test_every_subscriber_gets_each_snapshot() {
        let (hub, _intake) = hub(8);
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        hub.publish(snapshot(1));
        hub.publish(snapshot(2));

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.receiver.recv().await.unwrap().revision, 1);
            assert_eq!(sub.receiver.recv().await.unwrap().revision, 2);
        }
    }

    #[tokio::test]
    async fn test_new_subscriber_is_primed_with_latest() {
        let (hub, _intake) = hub(8);
        hub.publish(snapshot(3));

        let mut sub = hub.subscribe();
        let first = sub.receiver.recv().await.unwrap();
        assert_eq!(first.revision, 3);
        assert_eq!(first.products.len(), 3);
    }

    #[tokio::test]
    async fn test_stale_snapshots_are_discarded() {
        let (hub, _intake) = hub(8);
        let mut sub = hub.subscribe();

        hub.publish(snapshot(2));
        hub.publish(snapshot(1));
        hub.publish(snapshot(2));
        hub.publish(snapshot(3));

        assert_eq!(sub.receiver.recv().await.unwrap().revision, 2);
        assert_eq!(sub.receiver.recv().await.unwrap().revision, 3);
        assert!(sub.receiver.try_recv().is_err());
        assert_eq!(hub.latest_revision(), Some(3));
    }

    #[tokio::test]
    async fn test_full_queue_drops_only_for_slow_subscriber() {
        let (hub, _intake) = hub(1);
        let mut slow = hub.subscribe();
        let mut fast = hub.subscribe();

        hub.publish(snapshot(1));
        assert_eq!(fast.receiver.recv().await.unwrap().revision, 1);
        hub.publish(snapshot(2));
        assert_eq!(fast.receiver.recv().await.unwrap().revision, 2);

        assert_eq!(slow.receiver.recv().await.unwrap().revision, 1);
        assert!(slow.receiver.try_recv().is_err());
        assert_eq!(hub.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_closed_subscriber_is_pruned() {
        let (hub, _intake) = hub(4);
        let dropped = hub.subscribe();
        let mut kept = hub.subscribe();
        drop(dropped);

        hub.publish(snapshot(1));
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(kept.receiver.recv().await.unwrap().revision, 1);

        hub.unsubscribe(kept.id);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_forwards_to_intake() {
        let (hub, mut intake) = hub(4);
        let fields = ProductFields {
            title: Some("T".into()),
            ..Default::default()
        };
        let id = Uuid::new_v4();

        hub.submit(id, fields.clone()).await.unwrap();
        let submission = intake.recv().await.unwrap();
        assert_eq!(submission.subscriber, id);
        assert_eq!(submission.fields, fields);

        drop(intake);
        assert!(matches!(
            hub.submit(id, ProductFields::default()).await,
            Err(SyncError::ChannelError(_))
        ));
    }
}
