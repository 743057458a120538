//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct VendorConfig {
    /// Base URL of the external vendor fleet API.
    pub api_url: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub chain_id: u64,
    /// Synthetic device contract address.
    pub synthetic_contract: String,
    /// Vehicle NFT contract address.
    pub vehicle_contract: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    /// Topic carrying vendor enrollment confirmations.
    #[serde(default = "default_confirmations_topic")]
    pub confirmations_topic: String,
    /// Topic carrying vendor telemetry messages.
    #[serde(default = "default_telemetry_topic")]
    pub telemetry_topic: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_confirmations_topic() -> String {
    "vendor/enrollments".to_string()
}

fn default_telemetry_topic() -> String {
    "vendor/telemetry".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Ingest URL of the downstream node that receives canonical events.
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OnboardingConfig {
    /// Deadline for one connect call to resolve all confirmations.
    #[serde(default = "default_connect_deadline_secs")]
    pub connect_deadline_secs: u64,
    /// VINs to enroll when the gateway starts (dev convenience).
    #[serde(default)]
    pub connect_on_start: Vec<String>,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            connect_deadline_secs: default_connect_deadline_secs(),
            connect_on_start: Vec::new(),
        }
    }
}

fn default_connect_deadline_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
    /// Prometheus metrics HTTP port (0 to disable)
    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_metrics_interval(),
            prometheus_port: default_prometheus_port(),
        }
    }
}

fn default_metrics_interval() -> u64 {
    10
}

fn default_prometheus_port() -> u16 {
    9090
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CatalogConfig {
    /// Optional JSON file overriding the built-in signal catalog.
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    pub vendor: VendorConfig,
    pub identity: IdentityConfig,
    pub mqtt: MqttConfig,
    pub node: NodeConfig,
    #[serde(default)]
    pub onboarding: OnboardingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    vendor_api_url: String,
    vendor_client_id: String,
    vendor_client_secret: String,
    vendor_audience: String,
    chain_id: u64,
    synthetic_contract: String,
    vehicle_contract: String,
    mqtt_host: String,
    mqtt_port: u16,
    mqtt_confirmations_topic: String,
    mqtt_telemetry_topic: String,
    mqtt_username: Option<String>,
    mqtt_password: Option<String>,
    node_url: String,
    connect_deadline_secs: u64,
    connect_on_start: Vec<String>,
    metrics_interval_secs: u64,
    prometheus_port: u16,
    catalog_file: Option<String>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vendor_api_url: "http://localhost:8181".to_string(),
            vendor_client_id: "oracle-gateway".to_string(),
            vendor_client_secret: String::new(),
            vendor_audience: String::new(),
            chain_id: 1,
            synthetic_contract: "0x0000000000000000000000000000000000000000".to_string(),
            vehicle_contract: "0x0000000000000000000000000000000000000000".to_string(),
            mqtt_host: "localhost".to_string(),
            mqtt_port: 1883,
            mqtt_confirmations_topic: default_confirmations_topic(),
            mqtt_telemetry_topic: default_telemetry_topic(),
            mqtt_username: None,
            mqtt_password: None,
            node_url: "http://localhost:8080/v1/events".to_string(),
            connect_deadline_secs: default_connect_deadline_secs(),
            connect_on_start: Vec::new(),
            metrics_interval_secs: default_metrics_interval(),
            prometheus_port: default_prometheus_port(),
            catalog_file: None,
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine config file path: explicit argument, then the
    /// CONFIG_FILE environment variable, then the default.
    pub fn resolve_config_path(cli_path: Option<&str>) -> String {
        if let Some(path) = cli_path {
            return path.to_string();
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self {
            vendor_api_url: toml_config.vendor.api_url,
            vendor_client_id: toml_config.vendor.client_id,
            vendor_client_secret: toml_config.vendor.client_secret,
            vendor_audience: toml_config.vendor.audience,
            chain_id: toml_config.identity.chain_id,
            synthetic_contract: toml_config.identity.synthetic_contract,
            vehicle_contract: toml_config.identity.vehicle_contract,
            mqtt_host: toml_config.mqtt.host,
            mqtt_port: toml_config.mqtt.port,
            mqtt_confirmations_topic: toml_config.mqtt.confirmations_topic,
            mqtt_telemetry_topic: toml_config.mqtt.telemetry_topic,
            mqtt_username: toml_config.mqtt.username,
            mqtt_password: toml_config.mqtt.password,
            node_url: toml_config.node.url,
            connect_deadline_secs: toml_config.onboarding.connect_deadline_secs,
            connect_on_start: toml_config.onboarding.connect_on_start,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            prometheus_port: toml_config.metrics.prometheus_port,
            catalog_file: toml_config.catalog.file,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration from a path - falls back to defaults if missing
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    pub fn vendor_api_url(&self) -> &str {
        &self.vendor_api_url
    }

    pub fn vendor_client_id(&self) -> &str {
        &self.vendor_client_id
    }

    pub fn vendor_client_secret(&self) -> &str {
        &self.vendor_client_secret
    }

    pub fn vendor_audience(&self) -> &str {
        &self.vendor_audience
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn synthetic_contract(&self) -> &str {
        &self.synthetic_contract
    }

    pub fn vehicle_contract(&self) -> &str {
        &self.vehicle_contract
    }

    pub fn mqtt_host(&self) -> &str {
        &self.mqtt_host
    }

    pub fn mqtt_port(&self) -> u16 {
        self.mqtt_port
    }

    pub fn mqtt_confirmations_topic(&self) -> &str {
        &self.mqtt_confirmations_topic
    }

    pub fn mqtt_telemetry_topic(&self) -> &str {
        &self.mqtt_telemetry_topic
    }

    pub fn mqtt_username(&self) -> Option<&str> {
        self.mqtt_username.as_deref()
    }

    pub fn mqtt_password(&self) -> Option<&str> {
        self.mqtt_password.as_deref()
    }

    pub fn node_url(&self) -> &str {
        &self.node_url
    }

    pub fn connect_deadline_secs(&self) -> u64 {
        self.connect_deadline_secs
    }

    pub fn connect_on_start(&self) -> &[String] {
        &self.connect_on_start
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn prometheus_port(&self) -> u16 {
        self.prometheus_port
    }

    pub fn catalog_file(&self) -> Option<&str> {
        self.catalog_file.as_deref()
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}
