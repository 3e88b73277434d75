//! # lumen-core: Pure Domain Logic for Lumen
//!
//! This crate is the **heart** of the Lumen sensor-fleet proxy. It contains
//! the domain types and the latency-accounting math as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Lumen Architecture                           │
//! │                                                                     │
//! │  ┌─────────────────────────────────────────────────────────────┐    │
//! │  │                     apps/proxy (binary)                     │    │
//! │  │   config files ──► watcher ──► agent ──► shutdown           │    │
//! │  └────────────────────────────┬────────────────────────────────┘    │
//! │                               │                                     │
//! │  ┌────────────────────────────▼────────────────────────────────┐    │
//! │  │                  lumen-fleet (runtime)                      │    │
//! │  │   registry • ingest • broadcast • reconcile                 │    │
//! │  └────────────────────────────┬────────────────────────────────┘    │
//! │                               │                                     │
//! │  ┌────────────────────────────▼────────────────────────────────┐    │
//! │  │               ★ lumen-core (THIS CRATE) ★                   │    │
//! │  │                                                             │    │
//! │  │   ┌───────────┐  ┌───────────┐  ┌──────────────┐            │    │
//! │  │   │   types   │  │  window   │  │  validation  │            │    │
//! │  │   │ Position  │  │ Latency   │  │  snapshot    │            │    │
//! │  │   │ Plant     │  │ Window    │  │  rules       │            │    │
//! │  │   └───────────┘  └───────────┘  └──────────────┘            │    │
//! │  │                                                             │    │
//! │  │   NO I/O • NO ASYNC • PURE FUNCTIONS                        │    │
//! │  └─────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Position, Plant, SensorDescriptor, ...)
//! - [`window`] - Latency window accounting (capacity, push, flush mean)
//! - [`validation`] - Snapshot validation rules
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic - same input = same output
//! 2. **No I/O**: network, storage, file system access is FORBIDDEN here
//! 3. **Explicit Errors**: all errors are typed, never strings or panics

pub mod error;
pub mod types;
pub mod validation;
pub mod window;

// Re-export commonly used types at crate root
pub use error::{CoreError, CoreResult};
pub use types::{FleetSnapshot, Plant, Position, SensorDescriptor};
pub use window::{window_capacity, LatencyWindow};

/// Inclusive upper bound for a raw light reading (percent of full scale).
pub const MAX_READING_VALUE: i64 = 100;

/// Inclusive lower bound for a raw light reading.
pub const MIN_READING_VALUE: i64 = 0;
