//! Enrollment correlator
//!
//! Correlates a batch of VIN submissions with the asynchronous
//! confirmations the vendor publishes later on the shared stream. The
//! subscription is registered before the batch is submitted, so a
//! confirmation that beats the HTTP response is still captured. The wait
//! is bounded: on deadline expiry the call returns a partial outcome
//! instead of blocking on VINs the vendor never confirmed.

use crate::domain::types::{Vin, VendorConnectionStatus, ENROLLMENT_SUCCEEDED};
use crate::io::vehicle_store::VehicleStore;
use crate::io::vendor_api::{SubmissionOutcome, VendorEnrollmentApi};
use crate::services::router::ConfirmationRouter;
use anyhow::{anyhow, Context};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of one `connect` call. Resolved entries are in completion
/// order: submission-terminal outcomes first, then confirmation arrival
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOutcome {
    pub resolved: Vec<VendorConnectionStatus>,
    /// VINs still pending when the deadline expired.
    pub unresolved: Vec<Vin>,
}

pub struct EnrollmentCorrelator {
    api: Arc<dyn VendorEnrollmentApi>,
    store: Arc<dyn VehicleStore>,
    router: Arc<ConfirmationRouter>,
}

impl EnrollmentCorrelator {
    pub fn new(
        api: Arc<dyn VendorEnrollmentApi>,
        store: Arc<dyn VehicleStore>,
        router: Arc<ConfirmationRouter>,
    ) -> Self {
        Self { api, store, router }
    }

    /// Enroll a batch of VINs and wait up to `deadline` for their
    /// confirmations.
    pub async fn connect(
        &self,
        vins: &[Vin],
        deadline: Duration,
    ) -> anyhow::Result<ConnectOutcome> {
        // Subscribe before submitting so no confirmation can slip past.
        let mut subscription = self.router.subscribe(vins);

        let submissions =
            self.api.enroll_vehicles(vins).await.context("vehicle enrollment failed")?;

        let mut resolved = Vec::with_capacity(vins.len());
        let mut pending: HashSet<String> = HashSet::new();

        for submission in submissions {
            let vin = submission.vin.as_str();
            match submission.outcome {
                SubmissionOutcome::Accepted { external_id, status } => {
                    self.store
                        .update_enrollment_status(vin, &status, &external_id)
                        .await
                        .with_context(|| format!("failed to persist enrollment for {vin}"))?;
                    debug!(vin = %vin, external_id = %external_id, status = %status, "vehicle_enrolled");

                    if status == ENROLLMENT_SUCCEEDED {
                        subscription.resolve(vin);
                        resolved.push(VendorConnectionStatus {
                            vin: vin.to_string(),
                            external_id,
                            status,
                        });
                    } else {
                        pending.insert(vin.to_string());
                    }
                }
                SubmissionOutcome::AlreadyEnrolled => {
                    // Recover the existing enrollment instead of failing.
                    let records = self
                        .api
                        .lookup_enrollments(&submission.vin)
                        .await
                        .with_context(|| format!("enrollment lookup failed for {vin}"))?;
                    let record = records
                        .first()
                        .ok_or_else(|| anyhow!("no enrollment record found for {vin}"))?;

                    self.store
                        .update_enrollment_status(vin, ENROLLMENT_SUCCEEDED, &record.vehicle_id)
                        .await
                        .with_context(|| format!("failed to persist enrollment for {vin}"))?;
                    info!(vin = %vin, external_id = %record.vehicle_id, "existing_enrollment_adopted");

                    subscription.resolve(vin);
                    resolved.push(VendorConnectionStatus {
                        vin: vin.to_string(),
                        external_id: record.vehicle_id.clone(),
                        status: ENROLLMENT_SUCCEEDED.to_string(),
                    });
                }
            }
        }

        let deadline_at = tokio::time::Instant::now() + deadline;
        while !pending.is_empty() {
            tokio::select! {
                event = subscription.recv() => {
                    let Some(event) = event else { break };
                    if !pending.remove(&event.vin) {
                        continue;
                    }
                    self.store
                        .update_enrollment_status(&event.vin, &event.status, &event.external_id)
                        .await
                        .with_context(|| {
                            format!("failed to persist confirmation for {}", event.vin)
                        })?;
                    debug!(vin = %event.vin, status = %event.status, "confirmation_correlated");
                    subscription.resolve(&event.vin);
                    resolved.push(event.into());
                }
                _ = tokio::time::sleep_until(deadline_at) => {
                    warn!(
                        pending = %pending.len(),
                        "connect_deadline_expired"
                    );
                    break;
                }
            }
        }

        let unresolved: Vec<Vin> =
            vins.iter().filter(|v| pending.contains(v.as_str())).cloned().collect();
        Ok(ConnectOutcome { resolved, unresolved })
    }
}
