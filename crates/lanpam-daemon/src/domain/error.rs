//! Daemon error types.
//!
//! Per-connection failures are [`ProtocolError`]s. They end the connection
//! they occurred on and are never propagated to the listener.

use lanpam_crypto::CryptoError;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while driving one connection.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Malformed envelope or body JSON, or invalid base64
    #[error("Parse error: {0}")]
    Parse(String),

    /// Session key or body could not be decrypted
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Socket read/write/close failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An I/O step exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(&'static str),
}

impl ProtocolError {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolError::Parse(_) => "parse",
            ProtocolError::Crypto(_) => "crypto",
            ProtocolError::Io(_) => "io",
            ProtocolError::Timeout(_) => "timeout",
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// File that failed to load
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// Listener port is zero
    #[error("Invalid port: must be non-zero")]
    InvalidPort,

    /// Limit is out of range
    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    /// Device name is empty
    #[error("Device name cannot be empty")]
    EmptyDeviceName,
}

/// History persistence errors. Logged, never fatal to a connection.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// History file could not be written
    #[error("History I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// History could not be serialized
    #[error("History serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Top-level daemon errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Could not bind the listening socket
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address that failed
        addr: SocketAddr,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Device key could not be loaded or created
    #[error("Key store error: {0}")]
    KeyStore(String),

    /// Other I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
