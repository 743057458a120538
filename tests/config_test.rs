//! Integration tests for configuration loading

use oracle_gateway::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[vendor]
api_url = "https://vendor.example.com"
client_id = "test-client"
client_secret = "test-secret"
audience = "https://vendor.example.com/api"

[identity]
chain_id = 137
synthetic_contract = "0x1111111111111111111111111111111111111111"
vehicle_contract = "0x2222222222222222222222222222222222222222"

[mqtt]
host = "test-host"
port = 1884
confirmations_topic = "vendor/test/enrollments"
telemetry_topic = "vendor/test/telemetry"

[node]
url = "http://node.example.com/v1/events"

[onboarding]
connect_deadline_secs = 120
connect_on_start = ["1HGCM82633A123456"]

[metrics]
interval_secs = 15
prometheus_port = 9091

[catalog]
file = "/etc/oracle/catalog.json"
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.vendor_api_url(), "https://vendor.example.com");
    assert_eq!(config.vendor_client_id(), "test-client");
    assert_eq!(config.chain_id(), 137);
    assert_eq!(config.mqtt_host(), "test-host");
    assert_eq!(config.mqtt_port(), 1884);
    assert_eq!(config.mqtt_confirmations_topic(), "vendor/test/enrollments");
    assert_eq!(config.node_url(), "http://node.example.com/v1/events");
    assert_eq!(config.connect_deadline_secs(), 120);
    assert_eq!(config.connect_on_start(), vec!["1HGCM82633A123456".to_string()]);
    assert_eq!(config.prometheus_port(), 9091);
    assert_eq!(config.catalog_file(), Some("/etc/oracle/catalog.json"));
}

#[test]
fn test_topic_defaults_apply() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[vendor]
api_url = "https://vendor.example.com"
client_id = "test-client"
client_secret = "test-secret"

[identity]
chain_id = 1
synthetic_contract = "0x1111111111111111111111111111111111111111"
vehicle_contract = "0x2222222222222222222222222222222222222222"

[mqtt]
host = "localhost"
port = 1883

[node]
url = "http://localhost:8080/v1/events"
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.mqtt_confirmations_topic(), "vendor/enrollments");
    assert_eq!(config.mqtt_telemetry_topic(), "vendor/telemetry");
    assert_eq!(config.connect_deadline_secs(), 300);
    assert!(config.connect_on_start().is_empty());
    assert_eq!(config.prometheus_port(), 9090);
    assert!(config.catalog_file().is_none());
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.mqtt_host(), "localhost");
    assert_eq!(config.mqtt_port(), 1883);
    assert_eq!(config.connect_deadline_secs(), 300);
}
