//! External vendor fleet API client
//!
//! Wraps the vendor's enrollment and capability endpoints behind a trait
//! so the correlator can be exercised against mocks. The HTTP client
//! fetches an OAuth client-credentials token per batch call, discovers
//! the account's data source, and enrolls VINs one by one; the vendor's
//! "VinAlreadyEnrolledForDataService" rejection is reported as a
//! distinguished per-VIN outcome rather than an opaque failure.

use crate::domain::types::Vin;
use crate::infra::config::Config;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum VendorApiError {
    #[error("vendor api request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("vendor api returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected vendor response: {0}")]
    Schema(String),
}

/// Per-VIN outcome of a batch submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// The vendor accepted the enrollment; terminal iff status is "succeeded".
    Accepted { external_id: String, status: String },
    /// The VIN is already enrolled for this data service. The caller
    /// recovers the existing external id via [`VendorEnrollmentApi::lookup_enrollments`].
    AlreadyEnrolled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VinSubmission {
    pub vin: Vin,
    pub outcome: SubmissionOutcome,
}

/// An existing enrollment as returned by the vendor lookup endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EnrollmentRecord {
    pub id: String,
    #[serde(rename = "vehicleID")]
    pub vehicle_id: String,
    pub vin: String,
}

/// Per-VIN result of the connected-capability check.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityItem {
    pub vin: String,
    pub connected_capability: String,
}

#[async_trait]
pub trait VendorEnrollmentApi: Send + Sync {
    /// Submit a batch of VINs for enrollment. Per-VIN outcomes; any
    /// transport or vendor failure other than "already enrolled" fails
    /// the whole batch.
    async fn enroll_vehicles(&self, vins: &[Vin]) -> Result<Vec<VinSubmission>, VendorApiError>;

    /// Look up existing enrollments for a VIN (already-enrolled fallback).
    async fn lookup_enrollments(&self, vin: &Vin)
        -> Result<Vec<EnrollmentRecord>, VendorApiError>;

    /// Check connected capability for a batch of VINs.
    async fn validate_vehicles(&self, vins: &[Vin]) -> Result<Vec<CapabilityItem>, VendorApiError>;
}

pub struct HttpVendorApi {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    audience: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct DataSourcesResponse {
    items: Vec<DataSourceItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataSourceItem {
    name: String,
    accounts: Vec<String>,
    data_services: DataServiceNames,
}

#[derive(Debug, Deserialize)]
struct DataServiceNames {
    names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EnrollResponse {
    items: Vec<EnrolledItem>,
}

#[derive(Debug, Deserialize)]
struct EnrolledItem {
    id: String,
    status: String,
    #[allow(dead_code)]
    vin: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    error_type: String,
    #[allow(dead_code)]
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct EnrollmentsResponse {
    items: Vec<EnrollmentRecord>,
}

#[derive(Debug, Deserialize)]
struct CapabilityResponse {
    items: Vec<CapabilityItem>,
}

const ALREADY_ENROLLED_TYPE: &str = "VinAlreadyEnrolledForDataService";

impl HttpVendorApi {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.vendor_api_url().trim_end_matches('/').to_string(),
            client_id: config.vendor_client_id().to_string(),
            client_secret: config.vendor_client_secret().to_string(),
            audience: config.vendor_audience().to_string(),
        }
    }

    async fn get_token(&self) -> Result<String, VendorApiError> {
        let url = format!("{}/fleet/v3/oauth/token", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "clientId": self.client_id,
                "clientSecret": self.client_secret,
                "audience": self.audience,
                "grantType": "client_credentials",
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    async fn get_data_source(
        &self,
        token: &str,
    ) -> Result<(String, String, Vec<String>), VendorApiError> {
        let url = format!("{}/fleet/v3/data-sources", self.base_url);
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let sources: DataSourcesResponse = response.json().await?;
        let first = sources
            .items
            .into_iter()
            .next()
            .ok_or_else(|| VendorApiError::Schema("no data sources found".to_string()))?;
        let account = first
            .accounts
            .into_iter()
            .next()
            .ok_or_else(|| VendorApiError::Schema("data source has no accounts".to_string()))?;
        Ok((first.name, account, first.data_services.names))
    }

    async fn enroll_vehicle(
        &self,
        token: &str,
        data_source: &str,
        account: &str,
        data_services: &[String],
        vin: &Vin,
    ) -> Result<SubmissionOutcome, VendorApiError> {
        let url = format!("{}/fleet/v3/enrollments", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!([{
                "dataSource": data_source,
                "account": account,
                "vin": vin.as_str(),
                "dataServices": data_services,
                "allowMultipleSourceEnrollment": false,
            }]))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            if let Ok(error) = serde_json::from_str::<ErrorResponse>(&body) {
                if error.error.error_type == ALREADY_ENROLLED_TYPE {
                    debug!(vin = %vin, "vehicle_already_enrolled");
                    return Ok(SubmissionOutcome::AlreadyEnrolled);
                }
            }
            return Err(VendorApiError::Status { status: status.as_u16(), body });
        }

        // The vendor acknowledges asynchronous enrollment with 202
        if status != reqwest::StatusCode::ACCEPTED && status != reqwest::StatusCode::OK {
            return Err(Self::status_error(response).await);
        }

        let enrolled: EnrollResponse = response.json().await?;
        let item = enrolled
            .items
            .into_iter()
            .next()
            .ok_or_else(|| VendorApiError::Schema("no items in enrollment response".to_string()))?;
        Ok(SubmissionOutcome::Accepted { external_id: item.id, status: item.status })
    }

    async fn status_error(response: reqwest::Response) -> VendorApiError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, "vendor_api_error");
        VendorApiError::Status { status, body }
    }
}

#[async_trait]
impl VendorEnrollmentApi for HttpVendorApi {
    async fn enroll_vehicles(&self, vins: &[Vin]) -> Result<Vec<VinSubmission>, VendorApiError> {
        let token = self.get_token().await?;
        let (data_source, account, data_services) = self.get_data_source(&token).await?;

        let mut result = Vec::with_capacity(vins.len());
        for vin in vins {
            let outcome = self
                .enroll_vehicle(&token, &data_source, &account, &data_services, vin)
                .await?;
            result.push(VinSubmission { vin: vin.clone(), outcome });
        }
        Ok(result)
    }

    async fn lookup_enrollments(
        &self,
        vin: &Vin,
    ) -> Result<Vec<EnrollmentRecord>, VendorApiError> {
        let token = self.get_token().await?;
        let url = format!("{}/fleet/v3/enrollments?vin={}", self.base_url, vin);
        let response = self.client.get(&url).bearer_auth(&token).send().await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let enrollments: EnrollmentsResponse = response.json().await?;
        Ok(enrollments.items)
    }

    async fn validate_vehicles(&self, vins: &[Vin]) -> Result<Vec<CapabilityItem>, VendorApiError> {
        let token = self.get_token().await?;
        let url = format!("{}/fleet/v3/connected-capability/quick/vins", self.base_url);
        let vins: Vec<&str> = vins.iter().map(Vin::as_str).collect();
        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&json!({ "vins": vins }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let capabilities: CapabilityResponse = response.json().await?;
        if capabilities.items.is_empty() {
            return Err(VendorApiError::Schema("no items in capability response".to_string()));
        }
        Ok(capabilities.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_enrolled_error_body_parses() {
        let body = r#"{"error":{"type":"VinAlreadyEnrolledForDataService","message":"dup"}}"#;
        let parsed: ErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.error_type, ALREADY_ENROLLED_TYPE);
    }

    #[test]
    fn test_enrollment_record_field_names() {
        let body = r#"{"items":[{"id":"enr-1","vehicleID":"veh-9","vin":"1HGCM82633A123456"}]}"#;
        let parsed: EnrollmentsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.items[0].vehicle_id, "veh-9");
    }

    #[test]
    fn test_capability_items_parse() {
        let body = r#"{"items":[{"vin":"1HGCM82633A123456","connectedCapability":"capable"}]}"#;
        let parsed: CapabilityResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.items[0].connected_capability, "capable");
    }
}
