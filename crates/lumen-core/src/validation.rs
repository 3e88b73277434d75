//! # Validation Module
//!
//! Load-time validation for configuration snapshots and inbound values.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                              │
//! │                                                                     │
//! │  Layer 1: Wire boundary (lumen-fleet protocol)                      │
//! │  ├── Payload shape (missing keys, non-integer fields)               │
//! │  └── MalformedReading - never reaches the registry                  │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: THIS MODULE - domain rules                                │
//! │  ├── Sampling period > 0                                            │
//! │  ├── Accumulation window holds ≥ 1 sample                           │
//! │  ├── Reading value within 0..=100                                   │
//! │  └── Sensor ids present and unique                                  │
//! │                                                                     │
//! │  A snapshot that fails here is rejected whole: reconciliation       │
//! │  never runs against a partially-valid configuration.                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::{CoreError, CoreResult};
use crate::types::{FleetSnapshot, SensorDescriptor};
use crate::window::window_capacity;
use crate::{MAX_READING_VALUE, MIN_READING_VALUE};

// =============================================================================
// Snapshot Validation
// =============================================================================

/// Validates a single sensor descriptor.
///
/// ## Rules
/// - id must not be empty
/// - sampling period must be positive
/// - the accumulation window must hold at least one sample
pub fn validate_descriptor(descriptor: &SensorDescriptor) -> CoreResult<()> {
    if descriptor.id.trim().is_empty() {
        return Err(CoreError::Required {
            field: "sensor id".to_string(),
        });
    }

    // window_capacity covers both the zero-period and degenerate-window cases
    window_capacity(
        &descriptor.id,
        descriptor.accumulation_window_minutes,
        descriptor.sampling_period_secs,
    )?;

    Ok(())
}

/// Validates a whole configuration snapshot.
///
/// Every descriptor must pass [`validate_descriptor`] and ids must be
/// unique across the fleet. The first violation aborts the load.
pub fn validate_snapshot(snapshot: &FleetSnapshot) -> CoreResult<()> {
    let mut seen = HashSet::new();

    for descriptor in &snapshot.sensors {
        validate_descriptor(descriptor)?;

        if !seen.insert(descriptor.id.as_str()) {
            return Err(CoreError::DuplicateSensorId {
                sensor_id: descriptor.id.clone(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Reading Validation
// =============================================================================

/// Validates a raw light reading (percent of full scale).
pub fn validate_reading_value(sensor_id: &str, value: i64) -> CoreResult<()> {
    if !(MIN_READING_VALUE..=MAX_READING_VALUE).contains(&value) {
        return Err(CoreError::ValueOutOfRange {
            sensor_id: sensor_id.to_string(),
            value,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
