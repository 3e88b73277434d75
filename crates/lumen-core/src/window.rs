//! # Latency Window Accounting
//!
//! The pure half of the latency accountant: a bounded buffer of latency
//! samples whose arithmetic mean is emitted when the window fills.
//!
//! ## Window Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Latency Window Lifecycle                         │
//! │                                                                     │
//! │  capacity = accumulation_window_minutes * 60 / sampling_period      │
//! │                                                                     │
//! │   push(l1) ──► [l1]                                                 │
//! │   push(l2) ──► [l1, l2]                                             │
//! │   ...                                                               │
//! │   push(lN) ──► [l1 .. lN]  len == capacity ──► is_full()            │
//! │                    │                                                │
//! │                    ▼                                                │
//! │   flush_mean() ──► mean(l1..lN) * 1e6  and window := []             │
//! │                                                                     │
//! │   HARD FLUSH: the window is emptied unconditionally once the mean   │
//! │   is taken, even if the downstream emission fails.                  │
//! │                                                                     │
//! │   A sampling-period change also clears the window (the runtime      │
//! │   calls reset()) - no sample may span two expected cadences.        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The 1e6 scale on the flushed mean is a deliberate unit-normalization
//! carried over from the deployed system; downstream dashboards key on it.

use crate::error::{CoreError, CoreResult};

/// Number of seconds in a minute, spelled out for the capacity derivation.
const SECS_PER_MINUTE: u64 = 60;

/// Scale applied to the flushed mean (seconds → microsecond-equivalent).
const MEAN_SCALE: f64 = 1e6;

// =============================================================================
// Capacity Derivation
// =============================================================================

/// Derives the latency-window capacity from the accumulation horizon and
/// the sampling period.
///
/// ## Rules
/// - `capacity = window_minutes * 60 / sampling_period_secs` (integer)
/// - A capacity below 1 is a configuration error
///
/// ## Example
/// ```rust
/// use lumen_core::window::window_capacity;
///
/// // 2 minutes of samples at a 60s cadence → 2 samples
/// assert_eq!(window_capacity("s1", 2, 60).unwrap(), 2);
/// assert!(window_capacity("s1", 1, 120).is_err());
/// ```
pub fn window_capacity(
    sensor_id: &str,
    window_minutes: u32,
    sampling_period_secs: u32,
) -> CoreResult<usize> {
    if sampling_period_secs == 0 {
        return Err(CoreError::InvalidSamplingPeriod {
            sensor_id: sensor_id.to_string(),
            period_secs: sampling_period_secs,
        });
    }

    let capacity = (window_minutes as u64 * SECS_PER_MINUTE) / sampling_period_secs as u64;
    if capacity < 1 {
        return Err(CoreError::DegenerateWindow {
            sensor_id: sensor_id.to_string(),
            window_minutes,
            sampling_period_secs,
        });
    }

    Ok(capacity as usize)
}

// =============================================================================
// Latency Window
// =============================================================================

/// Bounded buffer of latency samples (seconds, signed: positive = late).
///
/// ## Invariant
/// `len() <= capacity()` at all times. The runtime checks [`is_full`] after
/// every push and flushes immediately, so the buffer never overflows.
///
/// [`is_full`]: LatencyWindow::is_full
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyWindow {
    samples: Vec<f64>,
    capacity: usize,
}

impl LatencyWindow {
    /// Creates an empty window.
    ///
    /// Capacity is clamped to at least 1 so a hand-built window can never
    /// flush on an empty buffer; validated configurations reject the
    /// degenerate case earlier via [`window_capacity`].
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        LatencyWindow {
            samples: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if the window holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once the window has accumulated `capacity` samples.
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Appends one latency sample (seconds).
    pub fn push(&mut self, latency_secs: f64) {
        debug_assert!(self.samples.len() < self.capacity);
        self.samples.push(latency_secs);
    }

    /// Takes the arithmetic mean of the window, scaled to the
    /// microsecond-equivalent convention, and empties the buffer.
    ///
    /// Returns `None` if the window is empty. The clear is unconditional:
    /// callers emit the mean downstream *after* this returns, and a failed
    /// emission does not restore the samples.
    pub fn flush_mean(&mut self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }

        let sum: f64 = self.samples.iter().sum();
        let mean = sum / self.samples.len() as f64 * MEAN_SCALE;
        self.samples.clear();
        Some(mean)
    }

    /// Discards all samples and adopts a new capacity.
    ///
    /// Called on a sampling-period change so no latency sample spans two
    /// different expected cadences.
    pub fn reset(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.samples.clear();
    }

    /// Adopts a new capacity while keeping accumulated samples.
    ///
    /// Used when only the accumulation horizon changes (same cadence).
    /// If the window shrinks below the current length, the next reading
    /// observes `is_full` and flushes.
    pub fn resize(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_derivation() {
        assert_eq!(window_capacity("s1", 2, 60).unwrap(), 2);
        assert_eq!(window_capacity("s1", 10, 30).unwrap(), 20);
        // Integer division truncates
        assert_eq!(window_capacity("s1", 1, 45).unwrap(), 1);
    }

    #[test]
    fn test_capacity_rejects_degenerate_window() {
        let err = window_capacity("s1", 1, 120).unwrap_err();
        assert!(matches!(err, CoreError::DegenerateWindow { .. }));

        let err = window_capacity("s1", 0, 60).unwrap_err();
        assert!(matches!(err, CoreError::DegenerateWindow { .. }));
    }

    #[test]
    fn test_capacity_rejects_zero_period() {
        let err = window_capacity("s1", 2, 0).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSamplingPeriod { .. }));
    }

    #[test]
    fn test_window_never_exceeds_capacity() {
        let mut window = LatencyWindow::new(3);
        for i in 0..3 {
            assert!(!window.is_full());
            window.push(i as f64);
            assert!(window.len() <= window.capacity());
        }
        assert!(window.is_full());
    }

    #[test]
    fn test_flush_mean_scales_and_clears() {
        let mut window = LatencyWindow::new(2);
        window.push(0.5);
        window.push(1.5);

        let mean = window.flush_mean().unwrap();
        assert!((mean - 1.0e6).abs() < f64::EPSILON);
        assert!(window.is_empty());
    }

    #[test]
    fn test_flush_mean_on_empty_window() {
        let mut window = LatencyWindow::new(2);
        assert_eq!(window.flush_mean(), None);
    }

    #[test]
    fn test_negative_latencies_allowed() {
        // Early arrivals produce negative samples; the mean is signed too.
        let mut window = LatencyWindow::new(2);
        window.push(-2.0);
        window.push(-4.0);
        let mean = window.flush_mean().unwrap();
        assert!((mean + 3.0e6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resize_keeps_samples() {
        let mut window = LatencyWindow::new(4);
        window.push(1.0);
        window.push(2.0);

        window.resize(2);
        assert_eq!(window.len(), 2);
        assert!(window.is_full());

        window.resize(8);
        assert_eq!(window.len(), 2);
        assert!(!window.is_full());
    }

    #[test]
    fn test_reset_adopts_new_capacity() {
        let mut window = LatencyWindow::new(4);
        window.push(1.0);
        window.reset(2);
        assert!(window.is_empty());
        assert_eq!(window.capacity(), 2);

        // Clamped: a degenerate capacity never reaches zero
        window.reset(0);
        assert_eq!(window.capacity(), 1);
    }
}
