//! # Fleet Agent
//!
//! Process-lifetime orchestrator: seeds the registry from the snapshot
//! source, starts the broadcast loops and the reconcile worker, and
//! owns graceful shutdown.
//!
//! ## Component Graph
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        FleetAgent                                   │
//! │                                                                     │
//! │   SnapshotSource ──seed──► SensorRegistry ◄──reads── Broadcast      │
//! │        │                        ▲                    Scheduler      │
//! │        │                        │                        │          │
//! │        └──► ReconcileWorker ────┘                        ▼          │
//! │                  ▲         ensure_running(added)   StatusTransport  │
//! │                  │                                                  │
//! │           change_tx (mpsc) ◄── file watcher in the binary           │
//! │                                                                     │
//! │   IngestionHandler ──► registry.mutate + StorageGateway             │
//! │        ▲                                                            │
//! │        └── listener in the binary calls handle() per reading        │
//! │                                                                     │
//! │   shutdown(): watch flips true ──► worker + every broadcast loop    │
//! │   exits within one tick; in-flight registry mutations complete.     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::broadcast::BroadcastScheduler;
use crate::error::FleetResult;
use crate::ingest::IngestionHandler;
use crate::reconcile::{ReconciliationEngine, ReconcileWorker, SnapshotSource};
use crate::registry::SensorRegistry;
use crate::storage::StorageGateway;
use crate::transport::StatusTransport;

/// Buffered change signals; the worker debounces, so depth only matters
/// during a burst.
const CHANGE_CHANNEL_DEPTH: usize = 16;

// =============================================================================
// Fleet Agent
// =============================================================================

/// Running fleet runtime. Construct with [`FleetAgent::start`], stop
/// with [`FleetAgent::shutdown`].
pub struct FleetAgent {
    registry: Arc<SensorRegistry>,
    ingestion: Arc<IngestionHandler>,
    scheduler: Arc<BroadcastScheduler>,
    change_tx: mpsc::Sender<()>,
    shutdown_tx: watch::Sender<bool>,
    worker_handle: JoinHandle<()>,
}

impl FleetAgent {
    /// Loads the initial snapshot, seeds the registry, and spawns the
    /// background tasks.
    ///
    /// Fails if the initial snapshot cannot be loaded or is invalid;
    /// unlike live reloads there is no previous state to fall back to.
    pub async fn start(
        source: Arc<dyn SnapshotSource>,
        storage: Arc<dyn StorageGateway>,
        transport: Arc<dyn StatusTransport>,
    ) -> FleetResult<Self> {
        let registry = Arc::new(SensorRegistry::new());

        let initial = source.load().await?;
        let report = ReconciliationEngine::new(registry.clone())
            .reconcile(&initial)
            .await?;
        info!(sensors = report.added.len(), "Registry seeded from initial snapshot");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (change_tx, change_rx) = mpsc::channel(CHANGE_CHANNEL_DEPTH);

        let scheduler = Arc::new(BroadcastScheduler::new(
            registry.clone(),
            transport,
            shutdown_rx.clone(),
        ));
        scheduler.sync_with_registry().await;

        let worker = ReconcileWorker::new(
            source,
            registry.clone(),
            scheduler.clone(),
            change_rx,
            shutdown_rx,
        );
        let worker_handle = tokio::spawn(worker.run());

        let ingestion = Arc::new(IngestionHandler::new(registry.clone(), storage));

        info!("Fleet agent started");
        Ok(FleetAgent {
            registry,
            ingestion,
            scheduler,
            change_tx,
            shutdown_tx,
            worker_handle,
        })
    }

    /// Shared registry, for diagnostics.
    pub fn registry(&self) -> Arc<SensorRegistry> {
        self.registry.clone()
    }

    /// Entry point the listener feeds decoded readings into.
    pub fn ingestion_handler(&self) -> Arc<IngestionHandler> {
        self.ingestion.clone()
    }

    /// Sender for configuration change signals (the file watcher's end).
    pub fn change_sender(&self) -> mpsc::Sender<()> {
        self.change_tx.clone()
    }

    /// Stops the worker and every broadcast loop, waiting for them to
    /// exit. In-flight registry mutations run to completion first.
    pub async fn shutdown(self) {
        info!("Fleet agent shutting down");
        let _ = self.shutdown_tx.send(true);

        self.scheduler.join_all().await;
        if let Err(e) = self.worker_handle.await {
            warn!(error = %e, "Reconcile worker join failed");
        }
        info!("Fleet agent stopped");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FleetError;
    use crate::protocol::decode_reading;
    use crate::reconcile::RECONCILE_DEBOUNCE;
    use crate::storage::MemoryGateway;
    use crate::transport::MemoryTransport;
    use async_trait::async_trait;
    use chrono::Utc;
    use lumen_core::types::{FleetSnapshot, Plant, Position, SensorDescriptor};
    use std::time::Duration;

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

    struct MemorySource {
        snapshot: std::sync::Mutex<FleetSnapshot>,
    }

    impl MemorySource {
        fn new(sensors: Vec<SensorDescriptor>) -> Self {
            MemorySource {
                snapshot: std::sync::Mutex::new(FleetSnapshot { sensors }),
            }
        }

        fn set_sensors(&self, sensors: Vec<SensorDescriptor>) {
            self.snapshot.lock().unwrap().sensors = sensors;
        }
    }

    #[async_trait]
    impl SnapshotSource for MemorySource {
        async fn load(&self) -> FleetResult<FleetSnapshot> {
            Ok(self.snapshot.lock().unwrap().clone())
        }
    }

    async fn start_agent(
        sensors: Vec<SensorDescriptor>,
    ) -> (FleetAgent, Arc<MemorySource>, Arc<MemoryGateway>, Arc<MemoryTransport>) {
        let source = Arc::new(MemorySource::new(sensors));
        let storage = Arc::new(MemoryGateway::new());
        let transport = Arc::new(MemoryTransport::new());
        let agent = FleetAgent::start(source.clone(), storage.clone(), transport.clone())
            .await
            .unwrap();
        (agent, source, storage, transport)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_seeds_registry_and_broadcast() {
        let (agent, _source, _storage, transport) =
            start_agent(vec![descriptor("1", 60), descriptor("2", 30)]).await;

        assert_eq!(agent.registry().len().await, 2);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!transport.payloads_for("home/ldr1/sampling_period").is_empty());
        assert!(!transport.payloads_for("home/ldr2/sampling_period").is_empty());

        agent.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_initial_snapshot() {
        let source = Arc::new(MemorySource::new(vec![
            descriptor("1", 60),
            descriptor("1", 60),
        ]));
        let result = FleetAgent::start(
            source,
            Arc::new(MemoryGateway::new()),
            Arc::new(MemoryTransport::new()),
        )
        .await;
        assert!(matches!(result, Err(FleetError::InvalidSnapshot(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reading_flows_end_to_end() {
        let (agent, _source, storage, _transport) = start_agent(vec![descriptor("1", 60)]).await;

        let frame = decode_reading("sensor_id=1&location=kitchen&data=55").unwrap();
        let ack = agent
            .ingestion_handler()
            .handle(&frame, Utc::now())
            .await
            .unwrap();
        assert_eq!(ack.payload, "sensor_id=1&location=kitchen&data=55");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(storage.points().len(), 1);
        assert_eq!(agent.registry().get("1").await.unwrap().last_value(), Some(55));

        agent.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_signal_reaches_worker() {
        let (agent, source, _storage, _transport) = start_agent(vec![descriptor("1", 60)]).await;

        source.set_sensors(vec![descriptor("1", 60), descriptor("3", 45)]);
        agent.change_sender().send(()).await.unwrap();

        tokio::time::sleep(RECONCILE_DEBOUNCE * 4).await;
        assert!(agent.registry().contains("3").await);

        agent.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_background_tasks() {
        let (agent, _source, _storage, transport) = start_agent(vec![descriptor("1", 60)]).await;

        tokio::time::timeout(Duration::from_secs(10), agent.shutdown())
            .await
            .expect("shutdown did not complete within a tick");

        // No further status publishes after shutdown returns.
        let published = transport.messages().len();
        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(transport.messages().len(), published);
    }
}
