//! Shared types for the oracle gateway

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Enrollment status string the vendor uses for a completed connection.
pub const ENROLLMENT_SUCCEEDED: &str = "succeeded";

/// Validated 17-character vehicle identification number.
///
/// The VIN is the correlation key throughout the gateway: submissions,
/// confirmations and persisted vehicle rows are all keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Vin(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VinError {
    #[error("VIN must be 17 characters, got {0}")]
    Length(usize),
    #[error("VIN must be uppercase alphanumeric: {0:?}")]
    Charset(String),
}

impl Vin {
    pub fn new(s: impl Into<String>) -> Result<Self, VinError> {
        let s = s.into();
        if s.len() != 17 {
            return Err(VinError::Length(s.len()));
        }
        if !s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
            return Err(VinError::Charset(s));
        }
        Ok(Vin(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Vin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Vin {
    type Error = VinError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Vin::new(s)
    }
}

impl From<Vin> for String {
    fn from(vin: Vin) -> String {
        vin.0
    }
}

impl std::str::FromStr for Vin {
    type Err = VinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Vin::new(s)
    }
}

/// Asynchronous confirmation from the vendor integration.
///
/// Delivered over the shared inbound stream: unordered relative to
/// submission order, at-least-once, and not scoped to a particular
/// `connect` call. The VIN is kept as a plain string because the stream
/// is external input; routing never dereferences it as a validated VIN.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfirmationEvent {
    pub vin: String,
    #[serde(rename = "id")]
    pub external_id: String,
    pub status: String,
}

/// Resolved connection outcome for one VIN.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VendorConnectionStatus {
    pub vin: String,
    pub external_id: String,
    pub status: String,
}

impl From<ConfirmationEvent> for VendorConnectionStatus {
    fn from(event: ConfirmationEvent) -> Self {
        Self { vin: event.vin, external_id: event.external_id, status: event.status }
    }
}

/// Per-VIN result of a vendor capability check.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VendorCapabilityStatus {
    pub vin: String,
    pub status: String,
}

/// On-chain identity of an onboarded vehicle, used to build event DIDs.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleIdentity {
    pub chain_id: u64,
    /// Synthetic device contract address.
    pub synthetic_contract: String,
    /// Vehicle NFT contract address.
    pub vehicle_contract: String,
    pub synthetic_token_id: u32,
    /// 0 means the vehicle has not been minted yet.
    pub vehicle_token_id: u32,
}

/// Vehicle row as held by the vehicle-store collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRecord {
    pub vin: String,
    pub external_id: Option<String>,
    pub connection_status: Option<String>,
    pub onboarding_status: i32,
    pub synthetic_token_id: u32,
    pub vehicle_token_id: u32,
}

impl VehicleRecord {
    pub fn new(vin: impl Into<String>) -> Self {
        Self {
            vin: vin.into(),
            external_id: None,
            connection_status: None,
            onboarding_status: 0,
            synthetic_token_id: 0,
            vehicle_token_id: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection_status.as_deref() == Some(ENROLLMENT_SUCCEEDED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vin_valid() {
        let vin = Vin::new("1HGCM82633A123456").unwrap();
        assert_eq!(vin.as_str(), "1HGCM82633A123456");
    }

    #[test]
    fn test_vin_wrong_length() {
        assert_eq!(Vin::new("SHORT"), Err(VinError::Length(5)));
        assert!(matches!(Vin::new("1HGCM82633A1234567"), Err(VinError::Length(18))));
    }

    #[test]
    fn test_vin_rejects_lowercase() {
        assert!(matches!(Vin::new("1hgcm82633a123456"), Err(VinError::Charset(_))));
    }

    #[test]
    fn test_confirmation_event_json() {
        let json = r#"{"vin":"1HGCM82633A123456","id":"ext-1","status":"succeeded"}"#;
        let event: ConfirmationEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.vin, "1HGCM82633A123456");
        assert_eq!(event.external_id, "ext-1");
        assert_eq!(event.status, ENROLLMENT_SUCCEEDED);
    }

    #[test]
    fn test_connection_status_json_field_names() {
        let status = VendorConnectionStatus {
            vin: "1HGCM82633A123456".to_string(),
            external_id: "ext-1".to_string(),
            status: "succeeded".to_string(),
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"externalId\":\"ext-1\""));
    }
}
