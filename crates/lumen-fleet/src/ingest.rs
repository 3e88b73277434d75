//! # Ingestion Handler
//!
//! Applies one inbound reading to the registry and fans the resulting
//! points out to storage.
//!
//! ## Ingestion Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Ingestion Flow                                 │
//! │                                                                     │
//! │  listener ──► decode_reading ──► handle(frame, arrival)             │
//! │                                       │                             │
//! │                     unknown id ◄──────┤                             │
//! │                     (dropped,         │ registry.mutate(id, ..)     │
//! │                      counted)         │   apply_reading inside the  │
//! │                                       │   per-sensor lock           │
//! │                                       ▼                             │
//! │                              ┌────────────────┐                     │
//! │                              │  Ack (echo)    │ ◄── returned as     │
//! │                              └────────────────┘     soon as the     │
//! │                                       │             state update    │
//! │                     tokio::spawn ─────┘             completes       │
//! │                       │                                             │
//! │                       ├── write raw point (always)                  │
//! │                       └── write mean-latency point (on flush)       │
//! │                                                                     │
//! │  Storage writes are fire-and-forget: failures are logged, never     │
//! │  retried from this path, and never delay the ack.                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{FleetError, FleetResult};
use crate::protocol::{Ack, ReadingFrame};
use crate::registry::SensorRegistry;
use crate::storage::{
    StorageGateway, MEAN_LATENCY_FIELD, MEAN_LATENCY_MEASUREMENT, RAW_FIELD, RAW_MEASUREMENT,
};

// =============================================================================
// Ingestion Handler
// =============================================================================

/// Shared entry point for inbound readings. May be invoked concurrently
/// for different sensors; updates for one sensor serialize behind the
/// registry's per-sensor lock.
pub struct IngestionHandler {
    registry: Arc<SensorRegistry>,
    storage: Arc<dyn StorageGateway>,
    dropped: AtomicU64,
}

impl IngestionHandler {
    /// Creates a handler over the shared registry and storage seam.
    pub fn new(registry: Arc<SensorRegistry>, storage: Arc<dyn StorageGateway>) -> Self {
        IngestionHandler {
            registry,
            storage,
            dropped: AtomicU64::new(0),
        }
    }

    /// Readings dropped because their sensor id was unknown.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Applies one decoded reading.
    ///
    /// Acknowledges as soon as the in-memory update completes; storage
    /// writes happen in a detached task. Readings for unregistered ids
    /// are dropped (not queued) and counted.
    pub async fn handle(&self, frame: &ReadingFrame, arrival: DateTime<Utc>) -> FleetResult<Ack> {
        let outcome = self
            .registry
            .mutate(&frame.sensor_id, |record| {
                record.apply_reading(arrival, frame.value)
            })
            .await
            .ok_or_else(|| {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(sensor_id = %frame.sensor_id, "Reading for unknown sensor dropped");
                FleetError::UnknownSensor {
                    sensor_id: frame.sensor_id.clone(),
                }
            })?;

        debug!(
            sensor_id = %frame.sensor_id,
            value = frame.value,
            latency_secs = ?outcome.latency_secs,
            cadence_changed = outcome.cadence_changed,
            "Reading applied"
        );

        if outcome.cadence_changed {
            info!(sensor_id = %frame.sensor_id, "Cadence switched; latency accumulator flushed");
        }

        // Fire-and-forget storage writes; the ack does not wait for them.
        let storage = self.storage.clone();
        let sensor_id = frame.sensor_id.clone();
        let value = frame.value as f64;
        let means = outcome.flushed_means.clone();
        tokio::spawn(async move {
            if let Err(e) = storage
                .write_point(RAW_MEASUREMENT, RAW_FIELD, &sensor_id, value, arrival)
                .await
            {
                warn!(%sensor_id, error = %e, "Raw point write failed; point lost");
            }

            for mean in means {
                info!(%sensor_id, mean_latency = format!("{mean:.2}"), "Mean latency flushed");
                if let Err(e) = storage
                    .write_point(
                        MEAN_LATENCY_MEASUREMENT,
                        MEAN_LATENCY_FIELD,
                        &sensor_id,
                        mean,
                        arrival,
                    )
                    .await
                {
                    warn!(%sensor_id, error = %e, "Mean latency write failed; point lost");
                }
            }
        });

        Ok(Ack::echo(frame))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
