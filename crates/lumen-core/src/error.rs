//! # Error Types
//!
//! Domain-specific error types for lumen-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  lumen-core errors (this file)                                      │
//! │  └── CoreError        - Domain/configuration rule violations        │
//! │                                                                     │
//! │  lumen-fleet errors (separate crate)                                │
//! │  └── FleetError       - Runtime failures (ingest, publish, store)   │
//! │                                                                     │
//! │  Flow: CoreError → FleetError → logged at the task boundary         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (sensor id, offending value)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule violations.
///
/// These errors are raised at configuration-load or accounting time and
/// must be caught before the offending value reaches the fleet registry.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Accumulation window resolves to fewer than one latency sample.
    ///
    /// ## When This Occurs
    /// - `accumulation_window_minutes * 60 < sampling_period_secs`
    /// - A zero or negative window length in the configuration file
    ///
    /// Rejected at snapshot validation time, never mid-accounting.
    #[error(
        "Degenerate accumulation window for sensor {sensor_id}: \
         {window_minutes}min window at {sampling_period_secs}s cadence \
         holds less than one sample"
    )]
    DegenerateWindow {
        sensor_id: String,
        window_minutes: u32,
        sampling_period_secs: u32,
    },

    /// Sampling period must be a positive number of seconds.
    #[error("Invalid sampling period for sensor {sensor_id}: {period_secs}s")]
    InvalidSamplingPeriod { sensor_id: String, period_secs: u32 },

    /// Raw reading value outside the 0..=100 percent scale.
    #[error("Reading value {value} for sensor {sensor_id} is outside 0..=100")]
    ValueOutOfRange { sensor_id: String, value: i64 },

    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Two sensor descriptors share the same id.
    #[error("Duplicate sensor id '{sensor_id}' in configuration snapshot")]
    DuplicateSensorId { sensor_id: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_window_message() {
        let err = CoreError::DegenerateWindow {
            sensor_id: "ldr1".to_string(),
            window_minutes: 1,
            sampling_period_secs: 120,
        };
        let msg = err.to_string();
        assert!(msg.contains("ldr1"));
        assert!(msg.contains("120s"));
    }

    #[test]
    fn test_value_out_of_range_message() {
        let err = CoreError::ValueOutOfRange {
            sensor_id: "ldr2".to_string(),
            value: 140,
        };
        assert_eq!(
            err.to_string(),
            "Reading value 140 for sensor ldr2 is outside 0..=100"
        );
    }
}
