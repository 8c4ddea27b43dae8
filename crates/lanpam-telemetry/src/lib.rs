//! # LAN-PAM Telemetry
//!
//! Structured logging for the daemon and the requester tool.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lanpam_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(&TelemetryConfig::from_env())?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LANPAM_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `LANPAM_JSON_LOGS` | `false` | Emit JSON lines instead of compact text |
//! | `LANPAM_LOG_ANSI` | `true` | Colourise compact output |

#![warn(missing_docs)]

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_telemetry;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The log filter directive could not be parsed
    #[error("Invalid log filter '{directive}': {reason}")]
    Filter {
        /// Directive as supplied
        directive: String,
        /// Parser message
        reason: String,
    },

    /// A global subscriber was already installed
    #[error("Failed to install subscriber: {0}")]
    Install(String),
}

/// Span for one accepted connection, so every line it logs carries the peer.
#[macro_export]
macro_rules! connection_span {
    ($peer:expr) => {
        tracing::info_span!("connection", peer = %$peer, request_id = tracing::field::Empty)
    };
}
