//! # Domain Types
//!
//! Core domain types for the sensor fleet.
//!
//! ## Entity Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Fleet Data Model                             │
//! │                                                                     │
//! │  FleetSnapshot (one configuration load)                             │
//! │  └── Vec<SensorDescriptor>   (ordered, immutable once loaded)       │
//! │          ├── id              primary key across the fleet           │
//! │          ├── Position        where the sensor sits (mutable meta)   │
//! │          ├── Plant           what it watches (mutable meta)         │
//! │          ├── sampling_period_secs     expected reading cadence      │
//! │          ├── accumulation_window_minutes  latency mean horizon      │
//! │          └── listen_port     inbound endpoint (collaborator's)      │
//! │                                                                     │
//! │  The live SensorRecord lives in lumen-fleet; these types are the    │
//! │  read-only configuration input it is built from.                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

// =============================================================================
// Position
// =============================================================================

/// Physical placement of a sensor. Descriptive and mutable via reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Position identifier (e.g., "p1").
    pub id: String,

    /// Human-readable name (e.g., "living room window").
    pub name: String,

    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

// =============================================================================
// Plant
// =============================================================================

/// The plant a sensor watches over. Descriptive and mutable via reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    /// Plant species or type (e.g., "basil").
    #[serde(rename = "type")]
    pub kind: String,

    /// Hours of light exposure the plant needs per day.
    pub required_light_hours: u32,
}

// =============================================================================
// Sensor Descriptor
// =============================================================================

/// One sensor's entry in a configuration snapshot.
///
/// Read-only input to reconciliation; never mutated after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    /// Stable sensor identifier, unique across the fleet.
    pub id: String,

    /// Where the sensor sits.
    pub position: Position,

    /// The plant it watches.
    pub plant: Plant,

    /// Expected interval between readings, in seconds.
    pub sampling_period_secs: u32,

    /// Horizon of the latency accumulation window, in minutes.
    pub accumulation_window_minutes: u32,

    /// Port the wire listener binds for this sensor. The listener itself
    /// is an external collaborator; the runtime only carries the value.
    #[serde(default)]
    pub listen_port: Option<u16>,
}

// =============================================================================
// Fleet Snapshot
// =============================================================================

/// A complete configuration snapshot: the ordered set of sensor
/// descriptors from one configuration load.
///
/// Delivered whole to reconciliation - there is no partial/delta format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    /// Sensor descriptors in file order.
    pub sensors: Vec<SensorDescriptor>,
}

impl FleetSnapshot {
    /// Looks up a descriptor by sensor id.
    pub fn descriptor(&self, sensor_id: &str) -> Option<&SensorDescriptor> {
        self.sensors.iter().find(|d| d.id == sensor_id)
    }

    /// Returns true if the snapshot contains no sensors.
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
