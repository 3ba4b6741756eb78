//! Configuration management for ledctl
//!
//! Config files are stored in platform-appropriate locations:
//! - Linux: ~/.config/ledctl/
//! - macOS: ~/Library/Application Support/ledctl/
//! - Windows: %APPDATA%\ledctl\

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::transport::DEFAULT_COAP_PORT;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    NoDirFound,

    #[error("Invalid device address: {0}")]
    InvalidAddress(String),

    #[error("No device given and no default device configured")]
    NoDevice,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,

    /// Known devices
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// Client-side settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Device used when none is given on the command line
    pub default_device: Option<String>,

    /// Time allowed for one request/response exchange
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Ask before logging out
    #[serde(default)]
    pub confirm_logout: bool,
}

/// A known LED controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Display name
    pub name: String,

    /// Hostname or IP address
    pub host: String,

    /// CoAP port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_timeout_ms() -> u64 {
    3000
}
fn default_port() -> u16 {
    DEFAULT_COAP_PORT
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_device: None,
            timeout_ms: default_timeout_ms(),
            confirm_logout: false,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Get config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join("ledctl"))
            .ok_or(ConfigError::NoDirFound)
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from default location
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load config from specific path
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    /// Save config to specific path
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get device config by name
    pub fn get_device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.name == name)
    }

    /// Add or update device
    pub fn upsert_device(&mut self, device: DeviceConfig) {
        if let Some(existing) = self.devices.iter_mut().find(|d| d.name == device.name) {
            *existing = device;
        } else {
            self.devices.push(device);
        }
    }

    /// Pick the device to talk to.
    ///
    /// `target` may be a known device name or a raw `host[:port]`. Without a
    /// target the configured default device is used.
    pub fn resolve(&self, target: Option<&str>) -> Result<DeviceConfig, ConfigError> {
        let target = match target.or(self.client.default_device.as_deref()) {
            Some(t) => t,
            None => return Err(ConfigError::NoDevice),
        };

        if let Some(device) = self.get_device(target) {
            return Ok(device.clone());
        }

        let (host, port) = match target.rsplit_once(':') {
            // Bare IPv6 addresses contain ':' too; only split when the tail is a port
            Some((host, port)) if !host.contains(':') || host.ends_with(']') => {
                let port = port
                    .parse()
                    .map_err(|_| ConfigError::InvalidAddress(target.to_string()))?;
                (host.trim_start_matches('[').trim_end_matches(']'), port)
            }
            _ => (target, DEFAULT_COAP_PORT),
        };

        if host.is_empty() {
            return Err(ConfigError::InvalidAddress(target.to_string()));
        }

        Ok(DeviceConfig {
            name: target.to_string(),
            host: host.to_string(),
            port,
        })
    }
}
