//! Proxy configuration module.
//!
//! Two files live in the config directory:
//! - `default_config.json` - backend endpoints (storage, broker, listener)
//! - `sensors_config.json` - the fleet snapshot, reloaded live on save
//!
//! Missing `default_config.json` falls back to development defaults;
//! the sensors file is required.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Backend endpoints file name.
pub const DEFAULT_CONFIG_FILE: &str = "default_config.json";

/// Fleet snapshot file name. Saves to this file trigger reconciliation.
pub const SENSORS_CONFIG_FILE: &str = "sensors_config.json";

/// Proxy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Time-series storage endpoint.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Pub/sub broker endpoint.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Inbound reading listener.
    #[serde(default)]
    pub listener: ListenerConfig,
}

/// Time-series storage endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the storage backend.
    pub url: String,

    /// Organization the bucket belongs to.
    pub org: String,

    /// Bucket readings and latency means are written to.
    pub bucket: String,

    /// API token. Empty in development.
    #[serde(default)]
    pub token: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            url: "http://localhost:8086".to_string(),
            org: "lumen".to_string(),
            bucket: "plants".to_string(),
            token: String::new(),
        }
    }
}

/// Pub/sub broker endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker host.
    pub host: String,

    /// Broker port.
    pub port: u16,

    /// Broker username. Empty for anonymous access.
    #[serde(default)]
    pub username: String,

    /// Broker password.
    #[serde(default)]
    pub password: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig {
            host: "localhost".to_string(),
            port: 1883,
            username: String::new(),
            password: String::new(),
        }
    }
}

/// Inbound reading listener settings. Per-sensor ports live in the
/// sensor descriptors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Address the listener binds on.
    pub bind_ip: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        ListenerConfig {
            bind_ip: "127.0.0.1".to_string(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            storage: StorageConfig::default(),
            broker: BrokerConfig::default(),
            listener: ListenerConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Loads `default_config.json` from the config directory, falling
    /// back to development defaults if the file is absent.
    pub fn load(config_dir: &Path) -> anyhow::Result<Self> {
        let path = config_dir.join(DEFAULT_CONFIG_FILE);
        if !path.exists() {
            tracing::warn!(path = %path.display(), "No backend config file; using development defaults");
            return Ok(ProxyConfig::default());
        }

        let raw = std::fs::read_to_string(&path)?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Path of the fleet snapshot file inside the config directory.
    pub fn sensors_path(config_dir: &Path) -> PathBuf {
        config_dir.join(SENSORS_CONFIG_FILE)
    }
}
