//! # Storage Gateway Seam
//!
//! Contract with the time-series storage collaborator. The real backend
//! (an InfluxDB-style store in the deployed system) lives outside this
//! crate; the runtime only needs a point write and a range read.
//!
//! Measurement and field names are part of the downstream contract and
//! must not change: dashboards and the forecasting consumer key on them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::FleetResult;

// =============================================================================
// Measurement Naming
// =============================================================================

/// Measurement holding raw light readings.
pub const RAW_MEASUREMENT: &str = "ldrValue";

/// Field name for raw light readings.
pub const RAW_FIELD: &str = "ldr";

/// Measurement holding flushed latency-window means.
pub const MEAN_LATENCY_MEASUREMENT: &str = "meanLat";

/// Field name for flushed latency-window means.
pub const MEAN_LATENCY_FIELD: &str = "mean_lat";

// =============================================================================
// Gateway Trait
// =============================================================================

/// Write/read contract with the time-series store.
///
/// Concurrent calls are the collaborator's responsibility; the runtime
/// treats the gateway as a stateless external service.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Writes one sensor-tagged point.
    async fn write_point(
        &self,
        measurement: &str,
        field: &str,
        sensor_id: &str,
        value: f64,
        at: DateTime<Utc>,
    ) -> FleetResult<()>;

    /// Reads the ordered series for one sensor over the last N hours.
    ///
    /// Consumed by the forecasting collaborator, not by the runtime
    /// itself.
    async fn read_range(
        &self,
        sensor_id: &str,
        last_n_hours: u32,
    ) -> FleetResult<Vec<(DateTime<Utc>, f64)>>;
}

// =============================================================================
// Log Gateway
// =============================================================================

/// Gateway that only logs writes. Used by the proxy binary when no
/// storage backend is wired up.
#[derive(Debug, Default)]
pub struct LogGateway;

#[async_trait]
impl StorageGateway for LogGateway {
    async fn write_point(
        &self,
        measurement: &str,
        field: &str,
        sensor_id: &str,
        value: f64,
        at: DateTime<Utc>,
    ) -> FleetResult<()> {
        debug!(%measurement, %field, %sensor_id, value, %at, "Storage write");
        Ok(())
    }

    async fn read_range(
        &self,
        _sensor_id: &str,
        _last_n_hours: u32,
    ) -> FleetResult<Vec<(DateTime<Utc>, f64)>> {
        Ok(Vec::new())
    }
}

// =============================================================================
// Memory Gateway (test double)
// =============================================================================

/// One recorded point, for assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub measurement: String,
    pub field: String,
    pub sensor_id: String,
    pub value: f64,
    pub at: DateTime<Utc>,
}

/// In-memory gateway for tests: records writes, can be told to fail,
/// and can delay writes to expose ordering assumptions.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    points: std::sync::Mutex<Vec<StoredPoint>>,
    fail_writes: std::sync::atomic::AtomicBool,
    write_delay: std::sync::Mutex<Option<std::time::Duration>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// All points written so far, in write order.
    pub fn points(&self) -> Vec<StoredPoint> {
        self.points.lock().expect("points lock").clone()
    }

    /// Points for one measurement.
    pub fn points_for(&self, measurement: &str) -> Vec<StoredPoint> {
        self.points()
            .into_iter()
            .filter(|p| p.measurement == measurement)
            .collect()
    }

    /// Makes subsequent writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Delays each write by `delay` before it lands.
    pub fn set_write_delay(&self, delay: std::time::Duration) {
        *self.write_delay.lock().expect("delay lock") = Some(delay);
    }
}

#[async_trait]
impl StorageGateway for MemoryGateway {
    async fn write_point(
        &self,
        measurement: &str,
        field: &str,
        sensor_id: &str,
        value: f64,
        at: DateTime<Utc>,
    ) -> FleetResult<()> {
        let delay = *self.write_delay.lock().expect("delay lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(crate::error::FleetError::StorageWriteFailed(
                "memory gateway set to fail".to_string(),
            ));
        }

        self.points.lock().expect("points lock").push(StoredPoint {
            measurement: measurement.to_string(),
            field: field.to_string(),
            sensor_id: sensor_id.to_string(),
            value,
            at,
        });
        Ok(())
    }

    async fn read_range(
        &self,
        sensor_id: &str,
        _last_n_hours: u32,
    ) -> FleetResult<Vec<(DateTime<Utc>, f64)>> {
        let mut series: Vec<(DateTime<Utc>, f64)> = self
            .points()
            .into_iter()
            .filter(|p| p.sensor_id == sensor_id && p.measurement == RAW_MEASUREMENT)
            .map(|p| (p.at, p.value))
            .collect();
        series.sort_by_key(|(at, _)| *at);
        Ok(series)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
