//! Telemetry normalization
//!
//! Maps one vendor telemetry record to the canonical event envelope.
//! Signal emission rules, in fixed order:
//! - speed: always emitted when the catalog recognizes it, even at 0
//! - fuel level: only when strictly above 0 and at most 100
//! - odometer: always, converted from miles to kilometers
//! - longitude / latitude: independently, only when nonzero

use crate::domain::event::{CanonicalEvent, CanonicalSignal, EventHeader, NftDid, TelemetryPayload};
use crate::domain::telemetry::VendorTelemetryRecord;
use crate::domain::types::VehicleIdentity;
use crate::io::catalog::{
    SignalCatalog, SignalDefinition, SIG_FUEL_LEVEL, SIG_LATITUDE, SIG_LONGITUDE, SIG_ODOMETER,
    SIG_SPEED,
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub const MILES_TO_KM: f64 = 1.609344;

fn miles_to_kilometers(miles: f64) -> f64 {
    miles * MILES_TO_KM
}

/// Map a vendor record to canonical signals, applying catalog membership
/// and per-signal validity rules. All signals share the message timestamp.
pub fn map_signals(
    record: &VendorTelemetryRecord,
    ts: DateTime<Utc>,
    catalog: &HashMap<String, SignalDefinition>,
) -> Vec<CanonicalSignal> {
    let mut signals = Vec::with_capacity(5);

    if catalog.contains_key(SIG_SPEED) {
        signals.push(CanonicalSignal {
            name: SIG_SPEED.to_string(),
            timestamp: ts,
            value: record.speed.value,
        });
    }

    if catalog.contains_key(SIG_FUEL_LEVEL)
        && record.fuel_level.value > 0.0
        && record.fuel_level.value <= 100.0
    {
        signals.push(CanonicalSignal {
            name: SIG_FUEL_LEVEL.to_string(),
            timestamp: ts,
            value: record.fuel_level.value,
        });
    }

    if catalog.contains_key(SIG_ODOMETER) {
        signals.push(CanonicalSignal {
            name: SIG_ODOMETER.to_string(),
            timestamp: ts,
            value: miles_to_kilometers(record.odometer.value),
        });
    }

    if catalog.contains_key(SIG_LONGITUDE) && record.location.lon != 0.0 {
        signals.push(CanonicalSignal {
            name: SIG_LONGITUDE.to_string(),
            timestamp: ts,
            value: record.location.lon,
        });
    }

    if catalog.contains_key(SIG_LATITUDE) && record.location.lat != 0.0 {
        signals.push(CanonicalSignal {
            name: SIG_LATITUDE.to_string(),
            timestamp: ts,
            value: record.location.lat,
        });
    }

    signals
}

/// Build the canonical event for one telemetry message.
///
/// The producer DID comes from the synthetic device identity; the subject
/// DID from the vehicle identity, left empty while the vehicle token id
/// is 0. Zero mapped signals is a valid event, not an error.
pub fn normalize(
    identity: &VehicleIdentity,
    vin: &str,
    record: &VendorTelemetryRecord,
    ts: DateTime<Utc>,
    catalog: &dyn SignalCatalog,
) -> anyhow::Result<CanonicalEvent> {
    let signal_map = catalog.load_signal_map().context("failed to load signal catalog")?;

    let producer = NftDid {
        chain_id: identity.chain_id,
        contract: identity.synthetic_contract.clone(),
        token_id: identity.synthetic_token_id,
    }
    .to_string();

    let subject = if identity.vehicle_token_id != 0 {
        NftDid {
            chain_id: identity.chain_id,
            contract: identity.vehicle_contract.clone(),
            token_id: identity.vehicle_token_id,
        }
        .to_string()
    } else {
        String::new()
    };

    let payload = TelemetryPayload {
        signals: map_signals(record, ts, &signal_map),
        vin: vin.to_string(),
    };
    let data = serde_json::value::to_raw_value(&payload)
        .context("failed to serialize telemetry payload")?;

    Ok(CanonicalEvent { header: EventHeader::status(ts, producer, subject), data })
}
