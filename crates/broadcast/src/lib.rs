use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use storage::OfferSnapshot;
use tokio::sync::broadcast;
use tracing::debug;

/// Snapshots buffered per subscriber. A subscriber that falls this far
/// behind skips intermediate snapshots and resumes with the latest, which
/// is acceptable: each snapshot supersedes the ones before it.
pub const CHANNEL_CAPACITY: usize = 16;

/// Fan-out point between the poll loop and connected dashboard clients.
///
/// Delivery is best-effort: no acknowledgment, no backpressure. Subscribers
/// joining after a publish see only subsequent snapshots.
#[derive(Clone)]
pub struct OfferBus {
    tx: broadcast::Sender<OfferSnapshot>,
    // 0 means "never published"; epoch ms otherwise.
    last_publish_ms: Arc<AtomicI64>,
}

impl OfferBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            last_publish_ms: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Publishes to every current subscriber. Empty snapshots are published
    /// like any other. A send error only means there are no subscribers.
    pub fn publish(&self, snapshot: OfferSnapshot) {
        self.last_publish_ms
            .store(snapshot.polled_at_ms, Ordering::Relaxed);
        match self.tx.send(snapshot) {
            Ok(receivers) => debug!(receivers, "snapshot published"),
            Err(_) => debug!("snapshot published with no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OfferSnapshot> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn last_publish_ms(&self) -> Option<i64> {
        match self.last_publish_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => Some(ms),
        }
    }
}

impl Default for OfferBus {
    fn default() -> Self {
        Self::new()
    }
}
