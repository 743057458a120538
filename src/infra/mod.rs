//! Infrastructure - configuration and metrics
//!
//! - `config` - Application configuration (TOML loading, defaults)
//! - `metrics` - Lock-free counters for stream and pipeline health

pub mod config;
pub mod metrics;

// Re-export commonly used types
pub use config::Config;
pub use metrics::Metrics;
