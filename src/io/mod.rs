//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `mqtt` - MQTT client for the vendor confirmation and telemetry streams
//! - `vendor_api` - HTTP client for the vendor fleet API
//! - `vehicle_store` - Persistence collaborator for vehicle rows
//! - `catalog` - Signal catalog collaborator
//! - `egress` - Typed channel between the pipeline and the publisher
//! - `node_api` - HTTP publisher for canonical events
//! - `prometheus` - Prometheus metrics HTTP endpoint

pub mod catalog;
pub mod egress;
pub mod mqtt;
pub mod node_api;
pub mod prometheus;
pub mod vehicle_store;
pub mod vendor_api;

// Re-export commonly used types
pub use catalog::{DefaultCatalog, FileCatalog, SignalCatalog};
pub use egress::{create_egress_channel, EgressSender};
pub use node_api::NodePublisher;
pub use vehicle_store::{MemoryVehicleStore, VehicleStore};
pub use vendor_api::{HttpVendorApi, VendorEnrollmentApi};
