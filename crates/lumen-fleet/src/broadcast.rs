//! # Broadcast Scheduler
//!
//! Periodic status emission: one long-lived task per sensor publishing
//! the configured sampling period and position name on a fixed cadence.
//!
//! ## Task Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Broadcast Task Model                             │
//! │                                                                     │
//! │  BroadcastScheduler                                                 │
//! │  ├── tasks: { sensor_id → JoinHandle }                              │
//! │  │                                                                  │
//! │  │   each loop (one per sensor, 5s tick):                           │
//! │  │     publish home/ldr{id}/sampling_period ── integer seconds      │
//! │  │     publish home/ldr{id}/position       ── position name         │
//! │  │                                                                  │
//! │  ├── ensure_running(id): idempotent spawn - reconciliation calls    │
//! │  │   this after adding sensors                                      │
//! │  │                                                                  │
//! │  └── shutdown: watch channel flips true, every loop exits within    │
//! │      one tick interval                                              │
//! │                                                                     │
//! │  ISOLATION: a publish failure for one sensor is logged and retried  │
//! │  on the next tick; it never blocks or terminates the other loops.   │
//! │  The loops are read-only with respect to the registry.              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::protocol::{position_topic, sampling_period_topic};
use crate::registry::SensorRegistry;
use crate::transport::StatusTransport;

/// Fixed status cadence, independent of each sensor's own sampling
/// period (and much shorter than typical periods).
pub const BROADCAST_INTERVAL: Duration = Duration::from_secs(5);

// =============================================================================
// Broadcast Scheduler
// =============================================================================

/// Spawns and tracks the per-sensor status loops.
pub struct BroadcastScheduler {
    registry: Arc<SensorRegistry>,
    transport: Arc<dyn StatusTransport>,
    tick: Duration,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl BroadcastScheduler {
    /// Creates a scheduler with the default 5s cadence.
    pub fn new(
        registry: Arc<SensorRegistry>,
        transport: Arc<dyn StatusTransport>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self::with_tick(registry, transport, shutdown_rx, BROADCAST_INTERVAL)
    }

    /// Creates a scheduler with a custom cadence (tests).
    pub fn with_tick(
        registry: Arc<SensorRegistry>,
        transport: Arc<dyn StatusTransport>,
        shutdown_rx: watch::Receiver<bool>,
        tick: Duration,
    ) -> Self {
        BroadcastScheduler {
            registry,
            transport,
            tick,
            shutdown_rx,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Number of live broadcast loops.
    pub async fn task_count(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Starts the status loop for one sensor if it is not already
    /// running. Idempotent; safe to call after every reconciliation.
    pub async fn ensure_running(&self, sensor_id: &str) {
        let mut tasks = self.tasks.lock().await;

        if let Some(handle) = tasks.get(sensor_id) {
            if !handle.is_finished() {
                return;
            }
        }

        debug!(%sensor_id, "Starting broadcast loop");
        let handle = tokio::spawn(Self::run_loop(
            self.registry.clone(),
            self.transport.clone(),
            sensor_id.to_string(),
            self.tick,
            self.shutdown_rx.clone(),
        ));
        tasks.insert(sensor_id.to_string(), handle);
    }

    /// Starts loops for every registered sensor.
    pub async fn sync_with_registry(&self) {
        for sensor_id in self.registry.ids().await {
            self.ensure_running(&sensor_id).await;
        }
    }

    /// Waits for every loop to exit. Call after flipping the shutdown
    /// watch; each loop observes it within one tick.
    pub async fn join_all(&self) {
        let handles: Vec<(String, JoinHandle<()>)> =
            self.tasks.lock().await.drain().collect();
        for (sensor_id, handle) in handles {
            if let Err(e) = handle.await {
                warn!(%sensor_id, error = %e, "Broadcast loop join failed");
            }
        }
    }

    /// One sensor's status loop.
    async fn run_loop(
        registry: Arc<SensorRegistry>,
        transport: Arc<dyn StatusTransport>,
        sensor_id: String,
        tick: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    Self::publish_status(&registry, transport.as_ref(), &sensor_id).await;
                }

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!(%sensor_id, "Broadcast loop stopped");
    }

    /// Publishes both status topics for one sensor. Failures are logged
    /// and retried on the next tick.
    async fn publish_status(
        registry: &SensorRegistry,
        transport: &dyn StatusTransport,
        sensor_id: &str,
    ) {
        // Read-only with respect to the registry.
        let Some(record) = registry.get(sensor_id).await else {
            // Sensors are never removed; an absent record here means the
            // loop raced startup. Try again next tick.
            warn!(%sensor_id, "Broadcast tick for unregistered sensor");
            return;
        };

        // Status reflects configured intent: the pending period is what
        // reconciliation last wrote, equal to the current period outside
        // the reconfiguration window.
        let period = record.pending_period_secs().to_string();
        let publications = [
            (sampling_period_topic(sensor_id), period),
            (position_topic(sensor_id), record.position.name.clone()),
        ];

        for (topic, payload) in publications {
            if let Err(e) = transport.publish(&topic, &payload).await {
                warn!(%sensor_id, %topic, error = %e, "Status publish failed; will retry next tick");
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
