//! Core domain types for the oracle gateway
//!
//! - `status` - Onboarding status code model (phase/outcome encoding)
//! - `types` - Shared identifiers and enrollment types
//! - `telemetry` - Vendor telemetry message schema
//! - `event` - Canonical event envelope and signals

pub mod event;
pub mod status;
pub mod telemetry;
pub mod types;
