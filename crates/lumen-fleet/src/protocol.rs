//! # Wire Payload Contracts
//!
//! The payload contracts exchanged with the external collaborators: the
//! inbound reading decode and the outbound status topics. The framing and
//! transport themselves (request/response listener, pub/sub broker) live
//! outside this crate.
//!
//! ## Inbound Reading Payload
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  sensor_id=<id>&location=<hint>&data=<0..100>                       │
//! │                                                                     │
//! │  • key/value pairs joined by '&', keys and values split on '='      │
//! │  • all three keys required; data must parse as an integer in        │
//! │    0..=100                                                          │
//! │  • anything else → MalformedReading, rejected at this boundary,     │
//! │    never reaches the registry                                       │
//! │                                                                     │
//! │  ACK: fixed success response echoing the original payload.          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use lumen_core::validation::validate_reading_value;

use crate::error::{FleetError, FleetResult};

// =============================================================================
// Topics
// =============================================================================

/// Status topic carrying the sampling period (integer seconds).
pub fn sampling_period_topic(sensor_id: &str) -> String {
    format!("home/ldr{sensor_id}/sampling_period")
}

/// Status topic carrying the position name.
pub fn position_topic(sensor_id: &str) -> String {
    format!("home/ldr{sensor_id}/position")
}

// =============================================================================
// Reading Frame
// =============================================================================

/// One decoded inbound reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingFrame {
    /// Claimed sensor id.
    pub sensor_id: String,

    /// Free-form location hint carried by the sensor firmware.
    pub location_hint: String,

    /// Raw sensed value, percent of full scale.
    pub value: i64,

    /// Original payload, echoed back in the ack.
    pub raw: String,
}

/// Decodes a `key=value&key=value` reading payload.
///
/// All of `sensor_id`, `location` and `data` must be present; `data`
/// must be an integer within 0..=100.
pub fn decode_reading(payload: &str) -> FleetResult<ReadingFrame> {
    let mut sensor_id = None;
    let mut location = None;
    let mut data = None;

    for pair in payload.split('&') {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| FleetError::MalformedReading(format!("bad pair '{pair}'")))?;
        match key {
            "sensor_id" => sensor_id = Some(value),
            "location" => location = Some(value),
            "data" => data = Some(value),
            // Unknown keys are ignored for forward compatibility
            _ => {}
        }
    }

    let sensor_id = sensor_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| FleetError::MalformedReading("missing sensor_id".to_string()))?;
    let location = location
        .ok_or_else(|| FleetError::MalformedReading("missing location".to_string()))?;
    let data = data.ok_or_else(|| FleetError::MalformedReading("missing data".to_string()))?;

    let value: i64 = data
        .parse()
        .map_err(|_| FleetError::MalformedReading(format!("data '{data}' is not an integer")))?;

    validate_reading_value(sensor_id, value)
        .map_err(|e| FleetError::MalformedReading(e.to_string()))?;

    Ok(ReadingFrame {
        sensor_id: sensor_id.to_string(),
        location_hint: location.to_string(),
        value,
        raw: payload.to_string(),
    })
}

// =============================================================================
// Ack
// =============================================================================

/// Fixed success response for an accepted reading.
///
/// Carries the original payload back to the sender, mirroring the wire
/// protocol's "changed" response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Echo of the accepted payload.
    pub payload: String,
}

impl Ack {
    /// Builds the ack for an accepted frame.
    pub fn echo(frame: &ReadingFrame) -> Self {
        Ack {
            payload: frame.raw.clone(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_well_formed_payload() {
        let frame = decode_reading("sensor_id=ldr1&location=kitchen&data=63").unwrap();
        assert_eq!(frame.sensor_id, "ldr1");
        assert_eq!(frame.location_hint, "kitchen");
        assert_eq!(frame.value, 63);
        assert_eq!(frame.raw, "sensor_id=ldr1&location=kitchen&data=63");
    }

    #[test]
    fn test_decode_ignores_unknown_keys() {
        let frame =
            decode_reading("sensor_id=ldr1&location=kitchen&data=10&fw=1.2").unwrap();
        assert_eq!(frame.value, 10);
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        for payload in [
            "location=kitchen&data=10",
            "sensor_id=ldr1&data=10",
            "sensor_id=ldr1&location=kitchen",
            "sensor_id=&location=kitchen&data=10",
        ] {
            let err = decode_reading(payload).unwrap_err();
            assert!(matches!(err, FleetError::MalformedReading(_)), "{payload}");
        }
    }

    #[test]
    fn test_decode_rejects_bad_values() {
        for payload in [
            "sensor_id=ldr1&location=kitchen&data=abc",
            "sensor_id=ldr1&location=kitchen&data=101",
            "sensor_id=ldr1&location=kitchen&data=-1",
            "sensor_id=ldr1&location=kitchen",
            "garbage",
        ] {
            assert!(decode_reading(payload).is_err(), "{payload}");
        }
    }

    #[test]
    fn test_ack_echoes_payload() {
        let frame = decode_reading("sensor_id=ldr1&location=kitchen&data=5").unwrap();
        let ack = Ack::echo(&frame);
        assert_eq!(ack.payload, frame.raw);
    }

    #[test]
    fn test_topic_shapes() {
        assert_eq!(sampling_period_topic("1"), "home/ldr1/sampling_period");
        assert_eq!(position_topic("2"), "home/ldr2/position");
    }
}
