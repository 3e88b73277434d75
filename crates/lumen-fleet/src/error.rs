//! # Fleet Error Types
//!
//! Error types for the fleet runtime.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Fleet Error Categories                         │
//! │                                                                     │
//! │  ┌────────────────┐  ┌─────────────────┐  ┌─────────────────────┐   │
//! │  │   Ingestion    │  │   Collaborators │  │   Configuration     │   │
//! │  │                │  │                 │  │                     │   │
//! │  │  UnknownSensor │  │  StorageWrite   │  │  SnapshotLoad       │   │
//! │  │  Malformed     │  │  StorageRead    │  │  InvalidSnapshot    │   │
//! │  │   Reading      │  │  Publish        │  │                     │   │
//! │  └────────────────┘  └─────────────────┘  └─────────────────────┘   │
//! │                                                                     │
//! │  PROPAGATION POLICY: failures local to one sensor or one tick are   │
//! │  logged and isolated; they never abort the registry or other        │
//! │  sensors' tasks. No global fatal error originates here.             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for fleet operations.
pub type FleetResult<T> = Result<T, FleetError>;

/// Fleet runtime error covering ingestion, collaborator and
/// configuration failures.
#[derive(Debug, Error)]
pub enum FleetError {
    // =========================================================================
    // Ingestion Errors
    // =========================================================================
    /// Reading for a sensor id not present in the registry.
    /// The reading is dropped and counted, never queued.
    #[error("Unknown sensor: {sensor_id}")]
    UnknownSensor { sensor_id: String },

    /// Inbound payload missing required fields or carrying a value the
    /// boundary rejects. Never reaches the registry.
    #[error("Malformed reading: {0}")]
    MalformedReading(String),

    // =========================================================================
    // Collaborator Errors
    // =========================================================================
    /// Storage write failed. Logged, not retried; the single point is lost.
    #[error("Storage write failed: {0}")]
    StorageWriteFailed(String),

    /// Storage range read failed (forecasting collaborator path).
    #[error("Storage read failed: {0}")]
    StorageReadFailed(String),

    /// Status publish failed for one tick. Broadcast continues next tick.
    #[error("Status publish failed on topic '{topic}': {reason}")]
    PublishFailed { topic: String, reason: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration snapshot could not be loaded. The reconciliation
    /// cycle is skipped; previous in-memory state stays authoritative.
    #[error("Failed to load configuration snapshot: {0}")]
    SnapshotLoadFailed(String),

    /// Snapshot loaded but violates a domain rule.
    #[error("Invalid configuration snapshot: {0}")]
    InvalidSnapshot(#[from] lumen_core::CoreError),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for FleetError {
    fn from(err: serde_json::Error) -> Self {
        FleetError::SnapshotLoadFailed(err.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
