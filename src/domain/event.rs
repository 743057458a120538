//! Canonical event envelope published downstream
//!
//! Wire shape:
//! `{header: {id, producer, subject, type, specVersion, dataVersion,
//! contentType, time}, data: {signals, vin}}`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use uuid::Uuid;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const SPEC_VERSION: &str = "1.0";
pub const DATA_VERSION: &str = "default/v1.0";
/// Event type tag for vehicle status telemetry.
pub const TYPE_STATUS: &str = "vehicle.status";

/// One normalized, catalog-recognized signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalSignal {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// NFT decentralized identifier: `did:nft:<chain>:<contract>_<token>`.
#[derive(Debug, Clone, PartialEq)]
pub struct NftDid {
    pub chain_id: u64,
    pub contract: String,
    pub token_id: u32,
}

impl std::fmt::Display for NftDid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "did:nft:{}:{}_{}", self.chain_id, self.contract, self.token_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventHeader {
    pub id: String,
    pub producer: String,
    /// Empty string when the vehicle has not been minted yet.
    pub subject: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub spec_version: String,
    pub data_version: String,
    pub content_type: String,
    pub time: DateTime<Utc>,
}

impl EventHeader {
    /// Build a status header with a fresh sortable id.
    pub fn status(ts: DateTime<Utc>, producer: String, subject: String) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            producer,
            subject,
            event_type: TYPE_STATUS.to_string(),
            spec_version: SPEC_VERSION.to_string(),
            data_version: DATA_VERSION.to_string(),
            content_type: CONTENT_TYPE_JSON.to_string(),
            time: ts,
        }
    }
}

/// Payload wrapped inside the envelope's `data` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryPayload {
    pub signals: Vec<CanonicalSignal>,
    pub vin: String,
}

/// The self-describing record published downstream after normalization.
///
/// `data` is pre-serialized so the payload bytes are fixed at build time
/// and pass through publishing unchanged.
#[derive(Debug, Serialize)]
pub struct CanonicalEvent {
    pub header: EventHeader,
    pub data: Box<RawValue>,
}

impl CanonicalEvent {
    pub fn payload(&self) -> serde_json::Result<TelemetryPayload> {
        serde_json::from_str(self.data.get())
    }
}
