//! Onboarding orchestrator
//!
//! Thin layer over the correlator and vendor API that translates
//! connection and capability outcomes into onboarding status codes on
//! the vehicle rows.

use crate::domain::status::{OnboardingStatus, Outcome, Phase};
use crate::domain::types::{VendorCapabilityStatus, Vin, ENROLLMENT_SUCCEEDED};
use crate::io::vehicle_store::VehicleStore;
use crate::io::vendor_api::VendorEnrollmentApi;
use crate::services::correlator::{ConnectOutcome, EnrollmentCorrelator};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Capability string the vendor reports for a vehicle it can serve.
const CAPABILITY_CAPABLE: &str = "capable";

pub struct OnboardingService {
    correlator: EnrollmentCorrelator,
    api: Arc<dyn VendorEnrollmentApi>,
    store: Arc<dyn VehicleStore>,
    connect_deadline: Duration,
}

impl OnboardingService {
    pub fn new(
        correlator: EnrollmentCorrelator,
        api: Arc<dyn VendorEnrollmentApi>,
        store: Arc<dyn VehicleStore>,
        connect_deadline: Duration,
    ) -> Self {
        Self { correlator, api, store, connect_deadline }
    }

    /// Enroll a batch of VINs with the vendor and record the outcome as
    /// onboarding status codes.
    pub async fn connect(&self, vins: &[Vin]) -> anyhow::Result<ConnectOutcome> {
        let outcome = self.correlator.connect(vins, self.connect_deadline).await?;

        for status in &outcome.resolved {
            let result = if status.status == ENROLLMENT_SUCCEEDED {
                Outcome::Success
            } else {
                Outcome::Failure
            };
            self.store
                .set_onboarding_status(
                    &status.vin,
                    OnboardingStatus::stage(Phase::Connect, result).code(),
                )
                .await
                .with_context(|| format!("failed to record connect status for {}", status.vin))?;
        }
        for vin in &outcome.unresolved {
            self.store
                .set_onboarding_status(
                    vin.as_str(),
                    OnboardingStatus::stage(Phase::Connect, Outcome::Pending).code(),
                )
                .await
                .with_context(|| format!("failed to record connect status for {vin}"))?;
        }

        info!(
            resolved = %outcome.resolved.len(),
            unresolved = %outcome.unresolved.len(),
            "connect_completed"
        );
        Ok(outcome)
    }

    /// Run the vendor capability check and record each VIN's validation
    /// status code.
    pub async fn validate(&self, vins: &[Vin]) -> anyhow::Result<Vec<VendorCapabilityStatus>> {
        let capabilities =
            self.api.validate_vehicles(vins).await.context("capability check failed")?;

        let mut result = Vec::with_capacity(capabilities.len());
        for capability in capabilities {
            let outcome = if capability.connected_capability.eq_ignore_ascii_case(CAPABILITY_CAPABLE)
            {
                Outcome::Success
            } else {
                Outcome::Failure
            };
            self.store
                .set_onboarding_status(
                    &capability.vin,
                    OnboardingStatus::stage(Phase::VendorValidation, outcome).code(),
                )
                .await
                .with_context(|| {
                    format!("failed to record validation status for {}", capability.vin)
                })?;
            result.push(VendorCapabilityStatus {
                vin: capability.vin,
                status: capability.connected_capability,
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ConfirmationEvent;
    use crate::infra::metrics::Metrics;
    use crate::io::vehicle_store::MemoryVehicleStore;
    use crate::io::vendor_api::{
        CapabilityItem, EnrollmentRecord, SubmissionOutcome, VendorApiError, VinSubmission,
    };
    use crate::services::router::ConfirmationRouter;
    use async_trait::async_trait;

    const VIN_A: &str = "1HGCM82633A123456";
    const VIN_B: &str = "5YJSA1E26MF123456";

    fn vin(s: &str) -> Vin {
        Vin::new(s).unwrap()
    }

    struct FixedApi {
        statuses: Vec<(String, String)>,
        capabilities: Vec<CapabilityItem>,
    }

    #[async_trait]
    impl VendorEnrollmentApi for FixedApi {
        async fn enroll_vehicles(
            &self,
            vins: &[Vin],
        ) -> Result<Vec<VinSubmission>, VendorApiError> {
            Ok(vins
                .iter()
                .map(|v| {
                    let status = self
                        .statuses
                        .iter()
                        .find(|(vin, _)| vin == v.as_str())
                        .map(|(_, s)| s.clone())
                        .unwrap_or_else(|| "pending".to_string());
                    VinSubmission {
                        vin: v.clone(),
                        outcome: SubmissionOutcome::Accepted {
                            external_id: format!("ext-{}", v.as_str()),
                            status,
                        },
                    }
                })
                .collect())
        }

        async fn lookup_enrollments(
            &self,
            _vin: &Vin,
        ) -> Result<Vec<EnrollmentRecord>, VendorApiError> {
            Ok(Vec::new())
        }

        async fn validate_vehicles(
            &self,
            _vins: &[Vin],
        ) -> Result<Vec<CapabilityItem>, VendorApiError> {
            Ok(self.capabilities.clone())
        }
    }

    fn service(api: FixedApi, store: Arc<MemoryVehicleStore>) -> OnboardingService {
        let api: Arc<dyn VendorEnrollmentApi> = Arc::new(api);
        let router = ConfirmationRouter::new(Arc::new(Metrics::new()));
        let correlator = EnrollmentCorrelator::new(api.clone(), store.clone(), router);
        OnboardingService::new(correlator, api, store, Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_connect_writes_success_code() {
        let api = FixedApi {
            statuses: vec![(VIN_A.to_string(), ENROLLMENT_SUCCEEDED.to_string())],
            capabilities: Vec::new(),
        };
        let store = Arc::new(MemoryVehicleStore::new());
        let service = service(api, store.clone());

        let outcome = service.connect(&[vin(VIN_A)]).await.unwrap();
        assert_eq!(outcome.resolved.len(), 1);

        let record = store.vehicle_by_vin(VIN_A).await.unwrap().unwrap();
        assert_eq!(record.onboarding_status, 43); // ConnectSuccess
    }

    #[tokio::test]
    async fn test_connect_writes_pending_code_on_deadline() {
        let api = FixedApi {
            statuses: vec![(VIN_A.to_string(), "pending".to_string())],
            capabilities: Vec::new(),
        };
        let store = Arc::new(MemoryVehicleStore::new());
        let service = service(api, store.clone());

        let outcome = service.connect(&[vin(VIN_A)]).await.unwrap();
        assert_eq!(outcome.unresolved, vec![vin(VIN_A)]);

        let record = store.vehicle_by_vin(VIN_A).await.unwrap().unwrap();
        assert_eq!(record.onboarding_status, 41); // ConnectPending
    }

    #[tokio::test]
    async fn test_connect_writes_failure_code_for_rejected_confirmation() {
        let api = FixedApi {
            statuses: vec![(VIN_A.to_string(), "pending".to_string())],
            capabilities: Vec::new(),
        };
        let store = Arc::new(MemoryVehicleStore::new());
        let api: Arc<dyn VendorEnrollmentApi> = Arc::new(api);
        let router = ConfirmationRouter::new(Arc::new(Metrics::new()));
        let correlator = EnrollmentCorrelator::new(api.clone(), store.clone(), router.clone());
        let service =
            OnboardingService::new(correlator, api, store.clone(), Duration::from_secs(5));

        let route_task = tokio::spawn({
            let router = router.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                router.route(ConfirmationEvent {
                    vin: VIN_A.to_string(),
                    external_id: "ext-1".to_string(),
                    status: "failed".to_string(),
                });
            }
        });

        service.connect(&[vin(VIN_A)]).await.unwrap();
        route_task.await.unwrap();

        let record = store.vehicle_by_vin(VIN_A).await.unwrap().unwrap();
        assert_eq!(record.onboarding_status, 42); // ConnectFailure
    }

    #[tokio::test]
    async fn test_validate_writes_validation_codes() {
        let api = FixedApi {
            statuses: Vec::new(),
            capabilities: vec![
                CapabilityItem {
                    vin: VIN_A.to_string(),
                    connected_capability: "capable".to_string(),
                },
                CapabilityItem {
                    vin: VIN_B.to_string(),
                    connected_capability: "none".to_string(),
                },
            ],
        };
        let store = Arc::new(MemoryVehicleStore::new());
        let service = service(api, store.clone());

        let statuses = service.validate(&[vin(VIN_A), vin(VIN_B)]).await.unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].status, "capable");

        let a = store.vehicle_by_vin(VIN_A).await.unwrap().unwrap();
        let b = store.vehicle_by_vin(VIN_B).await.unwrap().unwrap();
        assert_eq!(a.onboarding_status, 23); // VendorValidationSuccess
        assert_eq!(b.onboarding_status, 22); // VendorValidationFailure
    }
}
