//! Telemetry ingest pipeline
//!
//! Consumes parsed vendor messages, resolves each to a stored vehicle by
//! external id, and hands normalized canonical events to the egress
//! sender. Vehicles are cached briefly so a chatty stream does not hammer
//! the store. A message for an unknown, unconnected or unminted vehicle
//! is skipped, never fatal to the loop.

use crate::domain::telemetry::VendorMessage;
use crate::domain::types::{VehicleIdentity, VehicleRecord};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::catalog::SignalCatalog;
use crate::io::egress::EgressSender;
use crate::io::vehicle_store::VehicleStore;
use crate::services::normalizer;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

const VEHICLE_CACHE_TTL: Duration = Duration::from_secs(600);

struct CachedVehicle {
    record: VehicleRecord,
    fetched_at: Instant,
}

pub struct TelemetryPipeline {
    store: Arc<dyn VehicleStore>,
    catalog: Arc<dyn SignalCatalog>,
    egress: EgressSender,
    metrics: Arc<Metrics>,
    chain_id: u64,
    synthetic_contract: String,
    vehicle_contract: String,
    cache: Mutex<HashMap<String, CachedVehicle>>,
    cache_ttl: Duration,
}

impl TelemetryPipeline {
    pub fn new(
        config: &Config,
        store: Arc<dyn VehicleStore>,
        catalog: Arc<dyn SignalCatalog>,
        egress: EgressSender,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            catalog,
            egress,
            metrics,
            chain_id: config.chain_id(),
            synthetic_contract: config.synthetic_contract().to_string(),
            vehicle_contract: config.vehicle_contract().to_string(),
            cache: Mutex::new(HashMap::new()),
            cache_ttl: VEHICLE_CACHE_TTL,
        }
    }

    #[cfg(test)]
    fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    async fn lookup_vehicle(&self, external_id: &str) -> anyhow::Result<Option<VehicleRecord>> {
        if let Some(cached) = self.cache.lock().get(external_id) {
            if cached.fetched_at.elapsed() < self.cache_ttl {
                return Ok(Some(cached.record.clone()));
            }
        }

        let record = self.store.vehicle_by_external_id(external_id).await?;
        if let Some(ref record) = record {
            self.cache.lock().insert(
                external_id.to_string(),
                CachedVehicle { record: record.clone(), fetched_at: Instant::now() },
            );
        }
        Ok(record)
    }

    async fn handle_message(&self, message: VendorMessage) {
        let record = match self.lookup_vehicle(&message.vehicle_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.metrics.record_event_failed();
                warn!(external_id = %message.vehicle_id, "telemetry_for_unknown_vehicle");
                return;
            }
            Err(e) => {
                self.metrics.record_event_failed();
                warn!(external_id = %message.vehicle_id, error = %e, "vehicle_lookup_failed");
                return;
            }
        };

        if !record.is_connected() || record.vehicle_token_id == 0 {
            debug!(
                vin = %record.vin,
                connected = %record.is_connected(),
                vehicle_token_id = %record.vehicle_token_id,
                "telemetry_skipped"
            );
            return;
        }

        let identity = VehicleIdentity {
            chain_id: self.chain_id,
            synthetic_contract: self.synthetic_contract.clone(),
            vehicle_contract: self.vehicle_contract.clone(),
            synthetic_token_id: record.synthetic_token_id,
            vehicle_token_id: record.vehicle_token_id,
        };

        match normalizer::normalize(
            &identity,
            &record.vin,
            &message.data,
            message.timestamp,
            self.catalog.as_ref(),
        ) {
            Ok(event) => {
                self.metrics.record_event_normalized();
                self.egress.send(event);
            }
            Err(e) => {
                self.metrics.record_event_failed();
                warn!(vin = %record.vin, error = %e, "telemetry_normalize_failed");
            }
        }
    }

    /// Run the pipeline loop until shutdown or the channel closes.
    pub async fn run(
        &self,
        mut rx: mpsc::Receiver<VendorMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("telemetry_pipeline_started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("telemetry_pipeline_shutdown");
                        return;
                    }
                }
                message = rx.recv() => {
                    match message {
                        Some(message) => self.handle_message(message).await,
                        None => {
                            info!("telemetry_channel_closed_stopping_pipeline");
                            return;
                        }
                    }
                }
            }
        }
    }
}
