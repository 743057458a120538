//! Vendor telemetry message schema
//!
//! Mirrors the vendor's unbuffered stream payload: each reading is a
//! `{value, signalType, units}` object, location is a bare `{lat, lon}`
//! pair. Absent fields deserialize to zero values, which downstream
//! normalization rules then treat as "no reading" where applicable.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One telemetry message from the vendor stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    /// Vendor-side vehicle id; maps to the external id on the vehicle row.
    pub vehicle_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: VendorTelemetryRecord,
}

/// The telemetry readings carried by one vendor message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorTelemetryRecord {
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub speed: Reading,
    /// Odometer in miles.
    #[serde(default)]
    pub odometer: Reading,
    /// Fuel level percentage; valid range is strictly above 0 up to 100.
    #[serde(default)]
    pub fuel_level: Reading,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub signal_type: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
}

/// A coordinate of exactly 0 is treated as "no fix" for that coordinate.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "id": "01965837-7540-71fb-acc4-60264bfd17b4",
        "dataType": "telemetry",
        "vehicleId": "ffbf0b52-d478-4320-9a1c-3b83f547f33b",
        "timestamp": "2025-04-21T11:58:00.619Z",
        "data": {
            "location": {"lat": 36.5810399, "lon": -79.43646179999999},
            "speed": {"value": 0, "signalType": "canBus", "units": "mph"},
            "odometer": {"value": 27071.65, "signalType": "canBus", "units": "mi"},
            "fuelLevel": {"value": 79, "signalType": "canBus", "units": "pct"}
        }
    }"#;

    #[test]
    fn test_parse_vendor_message() {
        let msg: VendorMessage = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(msg.vehicle_id, "ffbf0b52-d478-4320-9a1c-3b83f547f33b");
        assert_eq!(msg.data.speed.value, 0.0);
        assert_eq!(msg.data.odometer.value, 27071.65);
        assert_eq!(msg.data.fuel_level.value, 79.0);
        assert_eq!(msg.data.location.lat, 36.5810399);
        assert_eq!(msg.data.location.lon, -79.43646179999999);
    }

    #[test]
    fn test_missing_readings_default_to_zero() {
        let json = r#"{
            "vehicleId": "abc",
            "timestamp": "2025-04-21T11:58:00.619Z",
            "data": {
                "speed": {"value": 12.5},
                "odometer": {"value": 100.0}
            }
        }"#;
        let msg: VendorMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.data.fuel_level.value, 0.0);
        assert_eq!(msg.data.location.lat, 0.0);
        assert_eq!(msg.data.location.lon, 0.0);
    }
}
