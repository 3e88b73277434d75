//! # lumen-fleet: Sensor Fleet Runtime for Lumen
//!
//! This crate provides the concurrent runtime for the Lumen plant-light
//! proxy: it ingests readings from a fleet of light sensors, keeps the
//! authoritative per-sensor state, accounts delivery latency against
//! each sensor's configured cadence, broadcasts periodic status, and
//! reconciles live configuration reloads.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Fleet Runtime Architecture                        │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                   FleetAgent (Main Orchestrator)                 │  │
//! │  │                                                                  │  │
//! │  │  Seeds the registry from the snapshot source, spawns the         │  │
//! │  │  background tasks, owns graceful shutdown                        │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ Ingestion      │  │ Broadcast      │  │  ReconcileWorker       │    │
//! │  │ Handler        │  │ Scheduler      │  │                        │    │
//! │  │                │  │                │  │  Debounced config      │    │
//! │  │ Decoded frame →│  │ One task per   │  │  reloads; adds and     │    │
//! │  │ registry mutate│  │ sensor, 5s     │  │  updates sensors,      │    │
//! │  │ + storage write│  │ status publish │  │  never removes them    │    │
//! │  └───────┬────────┘  └───────┬────────┘  └───────────┬────────────┘    │
//! │          │                   │                       │                 │
//! │          ▼                   ▼                       ▼                 │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │         SensorRegistry: RwLock map + per-sensor Mutex            │  │
//! │  │         (per-id updates totally ordered, cross-id parallel)      │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  SEAMS (implemented by the binary / deployment):                        │
//! │  • StorageGateway  - time-series point writes and range reads           │
//! │  • StatusTransport - pub/sub status publication                         │
//! │  • SnapshotSource  - desired fleet configuration on demand              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`agent`] - Main `FleetAgent` orchestrator
//! - [`broadcast`] - Per-sensor periodic status loops
//! - [`error`] - Runtime error types
//! - [`ingest`] - Reading application and storage fan-out
//! - [`protocol`] - Wire payload decode and status topics
//! - [`reconcile`] - Snapshot reconciliation engine and worker
//! - [`record`] - Per-sensor state and latency accounting
//! - [`registry`] - Concurrency-safe sensor collection
//! - [`storage`] - Time-series storage seam
//! - [`transport`] - Status publication seam
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lumen_fleet::{FleetAgent, decode_reading};
//!
//! let agent = FleetAgent::start(source, storage, transport).await?;
//!
//! // Listener feeds readings in:
//! let frame = decode_reading(payload)?;
//! let ack = agent.ingestion_handler().handle(&frame, chrono::Utc::now()).await?;
//!
//! // File watcher nudges reconciliation:
//! agent.change_sender().send(()).await?;
//!
//! agent.shutdown().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod agent;
pub mod broadcast;
pub mod error;
pub mod ingest;
pub mod protocol;
pub mod reconcile;
pub mod record;
pub mod registry;
pub mod storage;
pub mod transport;

// =============================================================================
// Re-exports
// =============================================================================

// Orchestration
pub use agent::FleetAgent;
pub use error::{FleetError, FleetResult};

// State
pub use record::{ReadingOutcome, SensorRecord};
pub use registry::SensorRegistry;

// Data path
pub use ingest::IngestionHandler;
pub use protocol::{decode_reading, position_topic, sampling_period_topic, Ack, ReadingFrame};

// Background tasks
pub use broadcast::{BroadcastScheduler, BROADCAST_INTERVAL};
pub use reconcile::{
    ReconciliationEngine, ReconciliationReport, ReconcileWorker, SnapshotSource,
    FALLBACK_RECONCILE_INTERVAL,
};

// Seams
pub use storage::{LogGateway, StorageGateway};
pub use transport::{LogTransport, StatusTransport};
