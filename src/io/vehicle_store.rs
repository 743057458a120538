//! Vehicle store collaborator
//!
//! Narrow persistence interface the core works against. The real store is
//! external to this gateway; the in-memory implementation backs tests and
//! single-process deployments.

use crate::domain::types::VehicleRecord;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

#[async_trait]
pub trait VehicleStore: Send + Sync {
    /// Record the vendor connection status and external id for a VIN.
    async fn update_enrollment_status(
        &self,
        vin: &str,
        status: &str,
        external_id: &str,
    ) -> anyhow::Result<()>;

    /// Write the onboarding status code for a VIN.
    async fn set_onboarding_status(&self, vin: &str, code: i32) -> anyhow::Result<()>;

    async fn vehicle_by_external_id(
        &self,
        external_id: &str,
    ) -> anyhow::Result<Option<VehicleRecord>>;

    async fn vehicle_by_vin(&self, vin: &str) -> anyhow::Result<Option<VehicleRecord>>;
}

/// In-memory vehicle store keyed by VIN.
#[derive(Default)]
pub struct MemoryVehicleStore {
    vehicles: RwLock<HashMap<String, VehicleRecord>>,
}

impl MemoryVehicleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a vehicle row (tests and dev startup).
    pub fn insert(&self, record: VehicleRecord) {
        self.vehicles.write().insert(record.vin.clone(), record);
    }
}

#[async_trait]
impl VehicleStore for MemoryVehicleStore {
    async fn update_enrollment_status(
        &self,
        vin: &str,
        status: &str,
        external_id: &str,
    ) -> anyhow::Result<()> {
        let mut vehicles = self.vehicles.write();
        let record =
            vehicles.entry(vin.to_string()).or_insert_with(|| VehicleRecord::new(vin));
        record.connection_status = Some(status.to_string());
        record.external_id = Some(external_id.to_string());
        debug!(vin = %vin, status = %status, external_id = %external_id, "enrollment_status_updated");
        Ok(())
    }

    async fn set_onboarding_status(&self, vin: &str, code: i32) -> anyhow::Result<()> {
        let mut vehicles = self.vehicles.write();
        let record =
            vehicles.entry(vin.to_string()).or_insert_with(|| VehicleRecord::new(vin));
        record.onboarding_status = code;
        debug!(vin = %vin, code = %code, "onboarding_status_updated");
        Ok(())
    }

    async fn vehicle_by_external_id(
        &self,
        external_id: &str,
    ) -> anyhow::Result<Option<VehicleRecord>> {
        let vehicles = self.vehicles.read();
        Ok(vehicles
            .values()
            .find(|v| v.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn vehicle_by_vin(&self, vin: &str) -> anyhow::Result<Option<VehicleRecord>> {
        Ok(self.vehicles.read().get(vin).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_enrollment_status_upserts() {
        let store = MemoryVehicleStore::new();
        store
            .update_enrollment_status("1HGCM82633A123456", "pending", "ext-1")
            .await
            .unwrap();

        let record = store.vehicle_by_vin("1HGCM82633A123456").await.unwrap().unwrap();
        assert_eq!(record.connection_status.as_deref(), Some("pending"));
        assert_eq!(record.external_id.as_deref(), Some("ext-1"));
    }

    #[tokio::test]
    async fn test_lookup_by_external_id() {
        let store = MemoryVehicleStore::new();
        store
            .update_enrollment_status("1HGCM82633A123456", "succeeded", "ext-7")
            .await
            .unwrap();

        let record = store.vehicle_by_external_id("ext-7").await.unwrap().unwrap();
        assert_eq!(record.vin, "1HGCM82633A123456");
        assert!(store.vehicle_by_external_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_onboarding_status() {
        let store = MemoryVehicleStore::new();
        store.set_onboarding_status("1HGCM82633A123456", 43).await.unwrap();
        let record = store.vehicle_by_vin("1HGCM82633A123456").await.unwrap().unwrap();
        assert_eq!(record.onboarding_status, 43);
    }
}
