//! Console configuration
//!
//! Loaded from an optional JSON file named by `MQBUS_CONFIG`, then
//! overridden by `MQBUS_LOG`, `MQBUS_LOG_JSON` and `MQBUS_CHANNEL_CAPACITY`.

use std::path::Path;

use anyhow::Context;
use mqbus_types::BusConfig;
use serde::{Deserialize, Serialize};

/// Console configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Log filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,

    /// Bus settings
    #[serde(default)]
    pub bus: BusConfig,
}

fn default_log_filter() -> String {
    "mqbus=info,mqbus_core=info,mqbus_storage=info".to_string()
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            log_json: false,
            bus: BusConfig::default(),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from the file and environment
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var("MQBUS_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.bus.validate()?;
        Ok(config)
    }

    /// Read a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(filter) = lookup("MQBUS_LOG") {
            self.log_filter = filter;
        }
        if let Some(json) = lookup("MQBUS_LOG_JSON") {
            self.log_json = matches!(json.as_str(), "1" | "true" | "yes");
        }
        if let Some(capacity) = lookup("MQBUS_CHANNEL_CAPACITY") {
            self.bus.channel_capacity = capacity
                .parse()
                .with_context(|| format!("MQBUS_CHANNEL_CAPACITY={capacity}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ConsoleConfig::default();
        config
            .apply_overrides(overrides(&[
                ("MQBUS_LOG", "debug"),
                ("MQBUS_LOG_JSON", "true"),
                ("MQBUS_CHANNEL_CAPACITY", "8"),
            ]))
            .unwrap();

        assert_eq!(config.log_filter, "debug");
        assert!(config.log_json);
        assert_eq!(config.bus.channel_capacity, 8);
    }

    #[test]
    fn test_bad_capacity_override() {
        let mut config = ConsoleConfig::default();
        assert!(config
            .apply_overrides(overrides(&[("MQBUS_CHANNEL_CAPACITY", "lots")]))
            .is_err());
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let path = std::env::temp_dir().join(format!("mqbus-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"bus": {"channel_capacity": 4}}"#).unwrap();

        let config = ConsoleConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.bus.channel_capacity, 4);
        assert_eq!(config.log_filter, default_log_filter());
        assert!(!config.log_json);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(ConsoleConfig::from_file("/nonexistent/mqbus.json").is_err());
    }
}
