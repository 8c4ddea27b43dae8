//! Daemon configuration with validation.
//!
//! Loaded from TOML; every section and field is optional.
//!
//! ```toml
//! [listener]
//! host = "0.0.0.0"
//! port = 4200
//! max_request_size = 1200
//! read_timeout_secs = 0
//!
//! [device]
//! name = "Workstation"
//!
//! [decision]
//! timeout_secs = 0
//!
//! [storage]
//! key_dir = "keys"
//! history_file = "history.json"
//! max_history = 500
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::ConfigError;

/// Default TCP port the requester connects to.
pub const DEFAULT_PORT: u16 = 4200;

/// Largest request accepted in the single read of a connection.
///
/// Requesters keep their envelope below this so it fits in one segment on a
/// typical 1500-byte MTU.
pub const MAX_REQUEST_SIZE: usize = 1200;

/// Upper bound for `listener.max_request_size`; the buffer is allocated per
/// connection.
pub const REQUEST_SIZE_CEILING: usize = 64 * 1024;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Listener configuration
    pub listener: ListenerConfig,
    /// Identity reported in responses
    pub device: DeviceConfig,
    /// Decision wait policy
    pub decision: DecisionConfig,
    /// Key and history locations
    pub storage: StorageConfig,
}

impl DaemonConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `LANPAM_PORT` and `LANPAM_DEVICE_NAME` overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("LANPAM_PORT") {
            match port.parse() {
                Ok(p) => self.listener.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid LANPAM_PORT"),
            }
        }
        if let Ok(name) = std::env::var("LANPAM_DEVICE_NAME") {
            self.device.name = name;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listener.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        if self.listener.max_request_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_request_size cannot be 0".into(),
            ));
        }

        if self.listener.max_request_size > REQUEST_SIZE_CEILING {
            return Err(ConfigError::InvalidLimit(format!(
                "max_request_size cannot exceed {REQUEST_SIZE_CEILING}"
            )));
        }

        if self.device.name.trim().is_empty() {
            return Err(ConfigError::EmptyDeviceName);
        }

        if self.storage.max_history == 0 {
            return Err(ConfigError::InvalidLimit("max_history cannot be 0".into()));
        }

        Ok(())
    }

    /// Get listener bind address
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listener.host, self.listener.port)
    }

    /// History file to persist to, if persistence is enabled.
    pub fn history_path(&self) -> Option<&Path> {
        self.storage
            .history_file
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

/// TCP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 4200)
    pub port: u16,
    /// Size of the single read buffer (default: 1200)
    pub max_request_size: usize,
    /// Deadline for the initial read in seconds, 0 = wait indefinitely
    pub read_timeout_secs: u64,
}

impl ListenerConfig {
    /// Initial read deadline, if any.
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_secs > 0).then(|| Duration::from_secs(self.read_timeout_secs))
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            max_request_size: MAX_REQUEST_SIZE,
            read_timeout_secs: 0,
        }
    }
}

/// Device identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Name returned in every response
    pub name: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "LAN-PAM Device".to_string(),
        }
    }
}

/// Decision wait policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Seconds to wait for a verdict before denying, 0 = wait indefinitely
    pub timeout_secs: u64,
}

impl DecisionConfig {
    /// Decision deadline, if any.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Key and history storage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the device key pair
    pub key_dir: PathBuf,
    /// JSON history file; an empty path keeps history in memory only
    pub history_file: Option<PathBuf>,
    /// Maximum history entries retained
    pub max_history: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key_dir: PathBuf::from("keys"),
            history_file: Some(PathBuf::from("history.json")),
            max_history: 500,
        }
    }
}
