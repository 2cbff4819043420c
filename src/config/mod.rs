use anyhow::{Context, Result};
use serde::Deserialize;

// MqttConfig lives with the transport it configures
pub use crate::mqtt::MqttConfig;

/// Complete Pulse configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PulseConfig {
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub router: RouterConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_storage_path() -> String {
    "pulse.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_page_size() -> u64 {
    15
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            default_page_size: default_page_size(),
        }
    }
}

/// Event router configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    /// Bounded capacity of each per-topic channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Consumers per topic channel
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_channel_capacity() -> usize {
    256
}

fn default_workers() -> usize {
    2
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            workers: default_workers(),
        }
    }
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig::default(),
            storage: StorageConfig::default(),
            api: ApiConfig::default(),
            router: RouterConfig::default(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<PulseConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path))?;
    let config: PulseConfig =
        toml::from_str(&contents).with_context(|| format!("invalid config file '{}'", path))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let config = PulseConfig::default();
        assert_eq!(config.mqtt.host, "localhost");
        assert_eq!(config.mqtt.command_topic, "device_actions");
        assert_eq!(config.storage.path, "pulse.db");
        assert_eq!(config.api.bind, "0.0.0.0:8080");
        assert_eq!(config.api.default_page_size, 15);
        assert_eq!(config.router.channel_capacity, 256);
        assert_eq!(config.router.workers, 2);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config: PulseConfig = toml::from_str("").unwrap();
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.api.default_page_size, 15);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let toml = r#"
            [mqtt]
            host = "broker.lan"

            [api]
            bind = "127.0.0.1:9090"
        "#;
        let config: PulseConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.mqtt.host, "broker.lan");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.api.bind, "127.0.0.1:9090");
        assert_eq!(config.router.workers, 2);
    }

    #[test]
    fn load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[storage]\npath = \"test.db\"").unwrap();
        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.storage.path, "test.db");
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_config("/nonexistent/pulse.toml").is_err());
    }
}
