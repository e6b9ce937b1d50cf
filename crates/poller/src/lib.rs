pub mod gate;

use std::time::Duration;

use broadcast::OfferBus;
use metrics::MetricsHandle;
use storage::{OfferSnapshot, Store};
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

pub use gate::{PollGate, PollState};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Drives fetch-then-publish cycles until the shutdown signal flips.
///
/// The first cycle runs immediately, then one per interval. A failed fetch
/// is logged and counted but never terminates the loop; the dashboard just
/// misses that update.
pub async fn run_poll_loop(
    store: Store,
    bus: OfferBus,
    gate: PollGate,
    metrics: MetricsHandle,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        if gate.status() == PollState::Paused {
            debug!("poll gate paused, skipping cycle");
            continue;
        }

        metrics.poll_cycles().inc();
        match store.fetch_recent_offers().await {
            Ok(offers) => {
                let snapshot = OfferSnapshot::new(offers);
                debug!(offers = snapshot.offers.len(), "publishing snapshot");
                bus.publish(snapshot);
                metrics.snapshots_published().inc();
            }
            Err(err) => {
                warn!(error = %err, "offer fetch failed, retrying next cycle");
                metrics.poll_failures().inc();
            }
        }
    }

    info!("poll loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::time::timeout;

    const TEST_INTERVAL: Duration = Duration::from_millis(25);
    const WAIT: Duration = Duration::from_secs(5);

    fn scratch_url(dir: &TempDir) -> String {
        format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("offers.db").display()
        )
    }

    async fn insert_offer(store: &Store, id: i64, fetched_at: i64) {
        sqlx::query(
            "INSERT INTO offers (id, title, price, url, image_url, fetched_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(format!("offer {id}"))
        .bind(4.5_f64)
        .bind(format!("https://shop.example/{id}"))
        .bind(format!("https://img.example/{id}.jpg"))
        .bind(fetched_at)
        .execute(store.pool())
        .await
        .expect("insert offer");
    }

    struct Harness {
        store: Store,
        bus: OfferBus,
        gate: PollGate,
        metrics: MetricsHandle,
        shutdown_tx: watch::Sender<bool>,
        task: tokio::task::JoinHandle<()>,
    }

    async fn start(dir: &TempDir, with_schema: bool) -> Harness {
        let store = Store::connect(&scratch_url(dir)).await.expect("connect");
        if with_schema {
            store.ensure_schema().await.expect("schema");
        }
        let bus = OfferBus::new();
        let gate = PollGate::new();
        let metrics = MetricsHandle::new().expect("metrics");
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_poll_loop(
            store.clone(),
            bus.clone(),
            gate.clone(),
            metrics.clone(),
            TEST_INTERVAL,
            shutdown_rx,
        ));
        Harness {
            store,
            bus,
            gate,
            metrics,
            shutdown_tx,
            task,
        }
    }

    #[tokio::test]
    async fn publishes_ordered_snapshot_each_cycle() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = Store::connect(&scratch_url(&dir)).await.expect("connect");
        store.ensure_schema().await.expect("schema");
        for id in 0..3 {
            insert_offer(&store, id, 100 + id).await;
        }
        drop(store);

        let h = start(&dir, true).await;
        let mut rx = h.bus.subscribe();

        let snapshot = timeout(WAIT, rx.recv())
            .await
            .expect("snapshot within deadline")
            .expect("channel open");
        let ids: Vec<i64> = snapshot.offers.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![2, 1, 0]);

        h.shutdown_tx.send(true).expect("signal shutdown");
        timeout(WAIT, h.task).await.expect("loop exits").expect("no panic");
    }

    #[tokio::test]
    async fn suppresses_fetch_failures_and_recovers() {
        let dir = tempfile::tempdir().expect("temp dir");
        // No schema: every fetch fails until the table appears.
        let h = start(&dir, false).await;
        let mut rx = h.bus.subscribe();

        tokio::time::sleep(TEST_INTERVAL * 4).await;
        assert!(h.metrics.poll_failures().get() > 0, "failures observed");
        assert!(!h.task.is_finished(), "loop survives fetch failures");

        h.store.ensure_schema().await.expect("schema");
        insert_offer(&h.store, 42, 999).await;

        let snapshot = loop {
            let s = timeout(WAIT, rx.recv())
                .await
                .expect("snapshot after recovery")
                .expect("channel open");
            if !s.offers.is_empty() {
                break s;
            }
        };
        assert_eq!(snapshot.offers[0].id, 42);

        h.shutdown_tx.send(true).expect("signal shutdown");
        timeout(WAIT, h.task).await.expect("loop exits").expect("no panic");
    }

    #[tokio::test]
    async fn paused_gate_skips_cycles_until_resumed() {
        let dir = tempfile::tempdir().expect("temp dir");
        let h = start(&dir, true).await;
        h.gate.pause();
        let mut rx = h.bus.subscribe();

        tokio::time::sleep(TEST_INTERVAL * 4).await;
        assert!(
            rx.try_recv().is_err(),
            "no snapshots while the gate is paused"
        );

        h.gate.resume();
        timeout(WAIT, rx.recv())
            .await
            .expect("snapshot after resume")
            .expect("channel open");

        h.shutdown_tx.send(true).expect("signal shutdown");
        timeout(WAIT, h.task).await.expect("loop exits").expect("no panic");
    }

    #[tokio::test]
    async fn stops_when_shutdown_signal_flips() {
        let dir = tempfile::tempdir().expect("temp dir");
        let h = start(&dir, true).await;

        h.shutdown_tx.send(true).expect("signal shutdown");
        timeout(WAIT, h.task).await.expect("loop exits").expect("no panic");
    }
}
