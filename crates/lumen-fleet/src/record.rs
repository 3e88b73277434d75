//! # Sensor Record
//!
//! The authoritative in-memory state for one sensor, and the latency
//! accounting that runs inside the registry's serialized update path.
//!
//! ## Reading Update Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                   apply_reading(arrival, value)                     │
//! │                                                                     │
//! │  1. pending != current?  ──► cadence boundary:                      │
//! │        clear window, current := pending, recompute capacity,        │
//! │        latency for THIS sample is unknown (nothing appended)        │
//! │                                                                     │
//! │  2. else, prior arrival known?                                      │
//! │        latency = arrival - last - current_period  (signed)          │
//! │        append to window                                             │
//! │                                                                     │
//! │  3. else (first-ever sample): nothing appended                      │
//! │                                                                     │
//! │  4. last := arrival                                                 │
//! │                                                                     │
//! │  5. window full?  ──► HARD FLUSH: mean × 1e6 out, window := []      │
//! │                                                                     │
//! │  Reconfiguration (apply_descriptor) only records INTENT: the        │
//! │  pending period. Step 1 makes the switch atomic with a real         │
//! │  reading, so no latency sample spans two expected cadences.         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};

use lumen_core::types::{Plant, Position, SensorDescriptor};
use lumen_core::window::{window_capacity, LatencyWindow};
use lumen_core::CoreResult;

// =============================================================================
// Reading Outcome
// =============================================================================

/// What one accepted reading did to the record's accounting.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadingOutcome {
    /// Latency computed for this reading (seconds, signed), if any.
    /// `None` on the first-ever sample and on a cadence boundary.
    pub latency_secs: Option<f64>,

    /// Window means flushed by this reading (microsecond-equivalent
    /// scale). Usually empty or one entry; two if a shrunken window had
    /// to be drained before appending.
    pub flushed_means: Vec<f64>,

    /// True if this reading crossed a reconfiguration boundary and the
    /// cadence switched from pending to current.
    pub cadence_changed: bool,
}

// =============================================================================
// Sensor Record
// =============================================================================

/// Live state for one sensor. Owned exclusively by the registry and
/// mutated only under its per-sensor lock.
#[derive(Debug, Clone)]
pub struct SensorRecord {
    /// Stable identifier, immutable after creation.
    sensor_id: String,

    /// Descriptive placement. Mutable via reconciliation.
    pub position: Position,

    /// Associated plant. Mutable via reconciliation.
    pub plant: Plant,

    /// Sampling period currently in effect for latency math (seconds).
    current_period_secs: u32,

    /// Newly configured period; converges with `current` on the next
    /// received reading.
    pending_period_secs: u32,

    /// Accumulation horizon in minutes (capacity derivation input).
    accumulation_window_minutes: u32,

    /// Bounded latency sample buffer.
    window: LatencyWindow,

    /// Arrival time of the previous reading, if any.
    last_receive: Option<DateTime<Utc>>,

    /// Most recent raw sensed value.
    last_value: Option<i64>,
}

impl SensorRecord {
    /// Builds a fresh record from a configuration descriptor.
    ///
    /// Current and pending periods start equal; the window starts empty.
    pub fn from_descriptor(descriptor: &SensorDescriptor) -> CoreResult<Self> {
        let capacity = window_capacity(
            &descriptor.id,
            descriptor.accumulation_window_minutes,
            descriptor.sampling_period_secs,
        )?;

        Ok(SensorRecord {
            sensor_id: descriptor.id.clone(),
            position: descriptor.position.clone(),
            plant: descriptor.plant.clone(),
            current_period_secs: descriptor.sampling_period_secs,
            pending_period_secs: descriptor.sampling_period_secs,
            accumulation_window_minutes: descriptor.accumulation_window_minutes,
            window: LatencyWindow::new(capacity),
            last_receive: None,
            last_value: None,
        })
    }

    /// Sensor id (immutable).
    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    /// Sampling period currently used for latency math.
    pub fn current_period_secs(&self) -> u32 {
        self.current_period_secs
    }

    /// Newly configured sampling period (equals current outside the
    /// reconfiguration-to-next-reading interval).
    pub fn pending_period_secs(&self) -> u32 {
        self.pending_period_secs
    }

    /// Accumulation horizon in minutes.
    pub fn accumulation_window_minutes(&self) -> u32 {
        self.accumulation_window_minutes
    }

    /// Number of latency samples currently accumulated.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Current window capacity.
    pub fn window_capacity(&self) -> usize {
        self.window.capacity()
    }

    /// Arrival time of the previous reading.
    pub fn last_receive(&self) -> Option<DateTime<Utc>> {
        self.last_receive
    }

    /// Most recent raw sensed value.
    pub fn last_value(&self) -> Option<i64> {
        self.last_value
    }

    // =========================================================================
    // Reading Path
    // =========================================================================

    /// Applies one accepted reading. Runs the latency accountant in the
    /// order documented in the module header.
    pub fn apply_reading(&mut self, arrival: DateTime<Utc>, value: i64) -> ReadingOutcome {
        let mut outcome = ReadingOutcome::default();

        if self.pending_period_secs != self.current_period_secs {
            // Reconfiguration boundary: switch cadence, clear the window.
            // No valid prior baseline exists under the new cadence, so this
            // sample's latency stays unknown.
            self.current_period_secs = self.pending_period_secs;
            let capacity = self.derive_capacity();
            self.window.reset(capacity);
            outcome.cadence_changed = true;
        } else if let Some(last) = self.last_receive {
            // A horizon-only shrink can leave the window already full;
            // drain it before appending so the bound holds.
            if self.window.is_full() {
                if let Some(mean) = self.window.flush_mean() {
                    outcome.flushed_means.push(mean);
                }
            }

            let elapsed = (arrival - last).num_milliseconds() as f64 / 1000.0;
            let latency = elapsed - self.current_period_secs as f64;
            self.window.push(latency);
            outcome.latency_secs = Some(latency);
        }
        // else: first-ever sample, no baseline, nothing appended

        self.last_receive = Some(arrival);
        self.last_value = Some(value);

        if self.window.is_full() {
            if let Some(mean) = self.window.flush_mean() {
                outcome.flushed_means.push(mean);
            }
        }

        outcome
    }

    // =========================================================================
    // Reconciliation Path
    // =========================================================================

    /// Applies a reloaded descriptor to the live record.
    ///
    /// Two-phase by design: metadata and the *pending* period change now;
    /// the cadence used for latency math and the accumulated window are
    /// left untouched until the next reading crosses the boundary in
    /// [`apply_reading`].
    pub fn apply_descriptor(&mut self, descriptor: &SensorDescriptor) {
        self.position = descriptor.position.clone();
        self.plant = descriptor.plant.clone();
        self.pending_period_secs = descriptor.sampling_period_secs;
        self.accumulation_window_minutes = descriptor.accumulation_window_minutes;

        // Horizon-only change with no cadence switch pending: the capacity
        // derivation still uses the current period, samples are kept.
        if self.pending_period_secs == self.current_period_secs {
            let capacity = self.derive_capacity();
            self.window.resize(capacity);
        }
    }

    /// Capacity under the *current* period, clamped to ≥ 1. Degenerate
    /// combinations are rejected at snapshot validation; the clamp only
    /// guards hand-built records in tests.
    fn derive_capacity(&self) -> usize {
        window_capacity(
            &self.sensor_id,
            self.accumulation_window_minutes,
            self.current_period_secs,
        )
        .unwrap_or(1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
