//! # Configuration Reconciliation
//!
//! Converges the live registry onto a freshly loaded fleet snapshot
//! without restarting the process.
//!
//! ## Reconciliation Pass
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Reconciliation Pass                              │
//! │                                                                     │
//! │  SnapshotSource::load() ──► validate_snapshot ──► per descriptor:   │
//! │                                   │                                 │
//! │                  invalid ◄────────┤  known id?                      │
//! │                  (whole pass      │   ├─ yes ──► apply_descriptor   │
//! │                   skipped)        │   │          (metadata now,     │
//! │                                   │   │           cadence deferred) │
//! │                                   │   └─ no ───► from_descriptor    │
//! │                                   │              + insert           │
//! │                                   ▼                                 │
//! │                        ReconciliationReport { added, updated }      │
//! │                                                                     │
//! │  Sensors absent from the snapshot are KEPT: removal would discard   │
//! │  a live latency window for what is usually a partial config edit.   │
//! │                                                                     │
//! │  The worker runs a pass on a debounced change signal and on a slow  │
//! │  fallback interval, so a missed signal only delays convergence.     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use lumen_core::types::FleetSnapshot;
use lumen_core::validation::validate_snapshot;

use crate::broadcast::BroadcastScheduler;
use crate::error::FleetResult;
use crate::record::SensorRecord;
use crate::registry::SensorRegistry;

/// Quiet period after a change signal before the pass runs, absorbing
/// bursts from editors that write config files several times per save.
pub const RECONCILE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Fallback cadence: a pass runs at least this often even if every
/// change signal is lost.
pub const FALLBACK_RECONCILE_INTERVAL: Duration = Duration::from_secs(60);

// =============================================================================
// Snapshot Source
// =============================================================================

/// Produces the desired fleet configuration on demand. The proxy binary
/// implements this over the config file on disk.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Loads and parses the current snapshot.
    async fn load(&self) -> FleetResult<FleetSnapshot>;
}

// =============================================================================
// Reconciliation Engine
// =============================================================================

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Sensor ids registered for the first time by this pass.
    pub added: Vec<String>,

    /// Sensor ids whose descriptor was applied to an existing record.
    pub updated: Vec<String>,
}

impl ReconciliationReport {
    /// True if the pass changed nothing structurally (updates to
    /// existing sensors still count as activity).
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty()
    }
}

/// Applies a validated snapshot to the live registry.
pub struct ReconciliationEngine {
    registry: Arc<SensorRegistry>,
}

impl ReconciliationEngine {
    pub fn new(registry: Arc<SensorRegistry>) -> Self {
        ReconciliationEngine { registry }
    }

    /// Runs one pass. The snapshot is validated up front; an invalid
    /// snapshot applies nothing at all.
    ///
    /// Known sensors get the descriptor applied under their per-sensor
    /// lock (cadence change deferred to the next reading); unknown
    /// sensors are registered fresh. Nothing is ever removed.
    pub async fn reconcile(&self, snapshot: &FleetSnapshot) -> FleetResult<ReconciliationReport> {
        validate_snapshot(snapshot)?;

        let mut report = ReconciliationReport::default();

        for descriptor in &snapshot.sensors {
            let applied = self
                .registry
                .mutate(&descriptor.id, |record| record.apply_descriptor(descriptor))
                .await;

            match applied {
                Some(()) => {
                    debug!(sensor_id = %descriptor.id, "Descriptor applied to live record");
                    report.updated.push(descriptor.id.clone());
                }
                None => {
                    let record = SensorRecord::from_descriptor(descriptor)?;
                    // A concurrent pass may have won the insert; either way
                    // the id is registered afterwards.
                    if self.registry.insert(record).await {
                        info!(sensor_id = %descriptor.id, "New sensor registered by reconciliation");
                        report.added.push(descriptor.id.clone());
                    }
                }
            }
        }

        info!(
            added = report.added.len(),
            updated = report.updated.len(),
            "Reconciliation pass complete"
        );
        Ok(report)
    }
}

// =============================================================================
// Reconcile Worker
// =============================================================================

/// Long-lived task: waits for change signals (debounced) or the fallback
/// tick, loads a snapshot, reconciles, and starts broadcast loops for
/// any sensors the pass added.
pub struct ReconcileWorker {
    source: Arc<dyn SnapshotSource>,
    engine: ReconciliationEngine,
    scheduler: Arc<BroadcastScheduler>,
    change_rx: mpsc::Receiver<()>,
    shutdown_rx: watch::Receiver<bool>,
    fallback: Duration,
}

impl ReconcileWorker {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        registry: Arc<SensorRegistry>,
        scheduler: Arc<BroadcastScheduler>,
        change_rx: mpsc::Receiver<()>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        ReconcileWorker {
            source,
            engine: ReconciliationEngine::new(registry),
            scheduler,
            change_rx,
            shutdown_rx,
            fallback: FALLBACK_RECONCILE_INTERVAL,
        }
    }

    /// Overrides the fallback cadence (tests).
    pub fn with_fallback(mut self, fallback: Duration) -> Self {
        self.fallback = fallback;
        self
    }

    /// Runs until the shutdown watch flips. Consumes the worker; spawn
    /// it as its own task.
    pub async fn run(mut self) {
        let mut ticker = interval(self.fallback);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately; startup already seeded the
        // registry, so swallow it.
        ticker.tick().await;

        loop {
            tokio::select! {
                signal = self.change_rx.recv() => {
                    if signal.is_none() {
                        // Change channel gone (watcher dropped); keep
                        // running on the fallback tick alone.
                        debug!("Change channel closed; falling back to periodic reconcile");
                        self.run_fallback_only(ticker).await;
                        return;
                    }
                    self.debounce().await;
                    self.run_pass().await;
                }

                _ = ticker.tick() => {
                    self.run_pass().await;
                }

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Reconcile worker stopped");
    }

    /// Degraded loop after the change channel closes.
    async fn run_fallback_only(mut self, mut ticker: tokio::time::Interval) {
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_pass().await;
                }
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Reconcile worker stopped");
    }

    /// Sleeps out the quiet period and drains signals that arrived
    /// during it, collapsing a burst into one pass.
    async fn debounce(&mut self) {
        tokio::time::sleep(RECONCILE_DEBOUNCE).await;
        while self.change_rx.try_recv().is_ok() {}
    }

    /// Loads and applies one snapshot. Any failure skips the cycle; the
    /// registry keeps its previous state untouched.
    async fn run_pass(&self) {
        let snapshot = match self.source.load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "Snapshot load failed; keeping previous configuration");
                return;
            }
        };

        match self.engine.reconcile(&snapshot).await {
            Ok(report) => {
                for sensor_id in &report.added {
                    self.scheduler.ensure_running(sensor_id).await;
                }
            }
            Err(e) => {
                error!(error = %e, "Snapshot rejected; keeping previous configuration");
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FleetError;
    use crate::transport::MemoryTransport;
    use lumen_core::types::{Plant, Position, SensorDescriptor};

    fn descriptor(id: &str, period: u32) -> SensorDescriptor {
        SensorDescriptor {
            id: id.to_string(),
            position: Position {
                id: "p1".to_string(),
                name: "window".to_string(),
                description: String::new(),
            },
            plant: Plant {
                kind: "basil".to_string(),
                required_light_hours: 6,
            },
            sampling_period_secs: period,
            accumulation_window_minutes: 2,
            listen_port: None,
        }
    }

    fn snapshot(descriptors: Vec<SensorDescriptor>) -> FleetSnapshot {
        FleetSnapshot { sensors: descriptors }
    }

    async fn seeded_registry(ids: &[(&str, u32)]) -> Arc<SensorRegistry> {
        let registry = Arc::new(SensorRegistry::new());
        for (id, period) in ids {
            let record = SensorRecord::from_descriptor(&descriptor(id, *period)).unwrap();
            registry.insert(record).await;
        }
        registry
    }

    // -------------------------------------------------------------------------
    // Engine
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_reconcile_adds_unknown_sensors() {
        let registry = seeded_registry(&[("1", 60)]).await;
        let engine = ReconciliationEngine::new(registry.clone());

        let report = engine
            .reconcile(&snapshot(vec![descriptor("1", 60), descriptor("2", 30)]))
            .await
            .unwrap();

        assert_eq!(report.added, vec!["2"]);
        assert_eq!(report.updated, vec!["1"]);
        assert!(registry.contains("2").await);
    }

    #[tokio::test]
    async fn test_reconcile_updates_existing_without_touching_cadence() {
        let registry = seeded_registry(&[("1", 60)]).await;
        let engine = ReconciliationEngine::new(registry.clone());

        engine
            .reconcile(&snapshot(vec![descriptor("1", 30)]))
            .await
            .unwrap();

        let record = registry.get("1").await.unwrap();
        assert_eq!(record.current_period_secs(), 60);
        assert_eq!(record.pending_period_secs(), 30);
    }

    #[tokio::test]
    async fn test_reconcile_never_removes_sensors() {
        let registry = seeded_registry(&[("1", 60), ("2", 60)]).await;
        let engine = ReconciliationEngine::new(registry.clone());

        let report = engine
            .reconcile(&snapshot(vec![descriptor("1", 60)]))
            .await
            .unwrap();

        assert!(report.added.is_empty());
        assert!(registry.contains("2").await);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_invalid_snapshot_applies_nothing() {
        let registry = seeded_registry(&[("1", 60)]).await;
        let engine = ReconciliationEngine::new(registry.clone());

        // Duplicate id in one snapshot: rejected before any mutation,
        // including the otherwise-valid pending-period change for "1".
        let bad = snapshot(vec![
            descriptor("1", 30),
            descriptor("2", 60),
            descriptor("2", 60),
        ]);
        let err = engine.reconcile(&bad).await.unwrap_err();
        assert!(matches!(err, FleetError::InvalidSnapshot(_)));

        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.get("1").await.unwrap().pending_period_secs(), 60);
    }

    // -------------------------------------------------------------------------
    // Worker
    // -------------------------------------------------------------------------

    /// Source backed by a swappable snapshot and a failure switch.
    struct MemorySource {
        snapshot: std::sync::Mutex<FleetSnapshot>,
        fail_loads: std::sync::atomic::AtomicBool,
        loads: std::sync::atomic::AtomicU64,
    }

    impl MemorySource {
        fn new(initial: FleetSnapshot) -> Self {
            MemorySource {
                snapshot: std::sync::Mutex::new(initial),
                fail_loads: std::sync::atomic::AtomicBool::new(false),
                loads: std::sync::atomic::AtomicU64::new(0),
            }
        }

        fn set_snapshot(&self, snapshot: FleetSnapshot) {
            *self.snapshot.lock().unwrap() = snapshot;
        }

        fn fail_loads(&self, fail: bool) {
            self.fail_loads
                .store(fail, std::sync::atomic::Ordering::SeqCst);
        }

        fn load_count(&self) -> u64 {
            self.loads.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SnapshotSource for MemorySource {
        async fn load(&self) -> FleetResult<FleetSnapshot> {
            self.loads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if self.fail_loads.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(FleetError::SnapshotLoadFailed("source set to fail".into()));
            }
            Ok(self.snapshot.lock().unwrap().clone())
        }
    }

    struct WorkerHarness {
        source: Arc<MemorySource>,
        registry: Arc<SensorRegistry>,
        scheduler: Arc<BroadcastScheduler>,
        change_tx: mpsc::Sender<()>,
        shutdown_tx: watch::Sender<bool>,
    }

    async fn spawn_worker(initial: FleetSnapshot, seeded: &[(&str, u32)]) -> WorkerHarness {
        let source = Arc::new(MemorySource::new(initial));
        let registry = seeded_registry(seeded).await;
        let (change_tx, change_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = Arc::new(BroadcastScheduler::new(
            registry.clone(),
            Arc::new(MemoryTransport::new()),
            shutdown_rx.clone(),
        ));

        let worker = ReconcileWorker::new(
            source.clone(),
            registry.clone(),
            scheduler.clone(),
            change_rx,
            shutdown_rx,
        )
        .with_fallback(Duration::from_secs(60));
        tokio::spawn(worker.run());

        WorkerHarness {
            source,
            registry,
            scheduler,
            change_tx,
            shutdown_tx,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_signal_triggers_pass_and_starts_broadcast() {
        let harness =
            spawn_worker(snapshot(vec![descriptor("1", 60), descriptor("2", 30)]), &[("1", 60)])
                .await;

        harness.change_tx.send(()).await.unwrap();
        tokio::time::sleep(RECONCILE_DEBOUNCE * 4).await;

        assert!(harness.registry.contains("2").await);
        assert_eq!(harness.scheduler.task_count().await, 1);
        let _ = harness.shutdown_tx.send(true);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_burst_collapses_into_one_pass() {
        let harness = spawn_worker(snapshot(vec![descriptor("1", 60)]), &[("1", 60)]).await;

        for _ in 0..5 {
            harness.change_tx.send(()).await.unwrap();
        }
        tokio::time::sleep(RECONCILE_DEBOUNCE * 4).await;

        assert_eq!(harness.source.load_count(), 1);
        let _ = harness.shutdown_tx.send(true);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_failure_keeps_previous_state() {
        let harness = spawn_worker(snapshot(vec![descriptor("1", 30)]), &[("1", 60)]).await;
        harness.source.fail_loads(true);

        harness.change_tx.send(()).await.unwrap();
        tokio::time::sleep(RECONCILE_DEBOUNCE * 4).await;

        // Cycle skipped entirely: the pending period is untouched.
        let record = harness.registry.get("1").await.unwrap();
        assert_eq!(record.pending_period_secs(), 60);

        // Source recovers: the next signal converges.
        harness.source.fail_loads(false);
        harness.change_tx.send(()).await.unwrap();
        tokio::time::sleep(RECONCILE_DEBOUNCE * 4).await;
        assert_eq!(
            harness.registry.get("1").await.unwrap().pending_period_secs(),
            30
        );
        let _ = harness.shutdown_tx.send(true);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_tick_reconciles_without_signal() {
        let harness = spawn_worker(snapshot(vec![descriptor("1", 60), descriptor("2", 30)]), &[("1", 60)])
            .await;

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(harness.registry.contains("2").await);
        let _ = harness.shutdown_tx.send(true);
    }
}
