//! Domain types for the daemon.
//!
//! Pure data, configuration and errors. Async infrastructure (the pending
//! request registry) lives in the adapters layer.

pub mod config;
pub mod error;
pub mod request_id;
pub mod types;

// Re-exports for convenience
pub use config::{DaemonConfig, DEFAULT_PORT, MAX_REQUEST_SIZE, REQUEST_SIZE_CEILING};
pub use error::{ConfigError, DaemonError, HistoryError, ProtocolError};
pub use request_id::RequestId;
pub use types::{Disposition, Envelope, HistoryEntry, Outcome, RequestBody, ResponseBody};
