//! Signal catalog collaborator
//!
//! The catalog declares which canonical signal names are currently
//! recognized/published. Catalog membership is the only schema validation
//! the normalizer performs, and the map is loaded once per normalization
//! call so catalog changes take effect without a restart.

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

pub const SIG_SPEED: &str = "speed";
pub const SIG_FUEL_LEVEL: &str = "powertrainFuelSystemRelativeLevel";
pub const SIG_ODOMETER: &str = "powertrainTransmissionTravelledDistance";
pub const SIG_LONGITUDE: &str = "currentLocationLongitude";
pub const SIG_LATITUDE: &str = "currentLocationLatitude";

/// One catalog entry. Only `name` is required; unit and type are carried
/// through for downstream consumers that want them.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SignalDefinition {
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, rename = "type")]
    pub value_type: Option<String>,
}

impl SignalDefinition {
    fn named(name: &str) -> Self {
        Self { name: name.to_string(), unit: None, value_type: None }
    }
}

pub trait SignalCatalog: Send + Sync {
    fn load_signal_map(&self) -> anyhow::Result<HashMap<String, SignalDefinition>>;
}

/// Built-in default catalog: the signal names this gateway can produce.
pub struct DefaultCatalog;

const DEFAULT_SIGNALS: [&str; 5] =
    [SIG_SPEED, SIG_FUEL_LEVEL, SIG_ODOMETER, SIG_LONGITUDE, SIG_LATITUDE];

impl SignalCatalog for DefaultCatalog {
    fn load_signal_map(&self) -> anyhow::Result<HashMap<String, SignalDefinition>> {
        Ok(DEFAULT_SIGNALS
            .iter()
            .map(|name| (name.to_string(), SignalDefinition::named(name)))
            .collect())
    }
}

/// Catalog backed by a JSON file: an array of signal definitions.
///
/// Re-read on every load so operators can narrow or extend the published
/// signal set at runtime.
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SignalCatalog for FileCatalog {
    fn load_signal_map(&self) -> anyhow::Result<HashMap<String, SignalDefinition>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read signal catalog {}", self.path.display()))?;
        let definitions: Vec<SignalDefinition> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse signal catalog {}", self.path.display()))?;
        Ok(definitions.into_iter().map(|d| (d.name.clone(), d)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_catalog_recognizes_all_produced_signals() {
        let map = DefaultCatalog.load_signal_map().unwrap();
        assert_eq!(map.len(), 5);
        for name in DEFAULT_SIGNALS {
            assert!(map.contains_key(name), "missing {name}");
        }
    }

    #[test]
    fn test_file_catalog_loads_definitions() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"[
                {"name": "speed", "unit": "km/h", "type": "float64"},
                {"name": "currentLocationLatitude"}
            ]"#,
        )
        .unwrap();
        file.flush().unwrap();

        let map = FileCatalog::new(file.path()).load_signal_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["speed"].unit.as_deref(), Some("km/h"));
        assert!(map.contains_key(SIG_LATITUDE));
        assert!(!map.contains_key(SIG_ODOMETER));
    }

    #[test]
    fn test_file_catalog_missing_file_is_error() {
        let catalog = FileCatalog::new("/nonexistent/catalog.json");
        assert!(catalog.load_signal_map().is_err());
    }
}
