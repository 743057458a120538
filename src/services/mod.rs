//! Services - business logic and state management
//!
//! This module contains the core business logic services:
//! - `router` - Demultiplexes vendor confirmations to waiting connect calls
//! - `correlator` - Correlates VIN submissions with asynchronous confirmations
//! - `onboarding` - Orchestrates connect/validate and writes status codes
//! - `normalizer` - Maps vendor telemetry to canonical events
//! - `pipeline` - Telemetry ingest loop feeding the egress channel

pub mod correlator;
pub mod normalizer;
pub mod onboarding;
pub mod pipeline;
pub mod router;

// Re-export commonly used types
pub use correlator::{ConnectOutcome, EnrollmentCorrelator};
pub use onboarding::OnboardingService;
pub use pipeline::TelemetryPipeline;
pub use router::{ConfirmationRouter, ConfirmationSubscription};
