//! Adapters Layer
//!
//! Concrete implementations of the ports plus the pending request registry.
//!
//! - `pending` - registry of parked requests (implements `DecisionSink`)
//! - `keys` - key store and `KeyProvider`
//! - `history` - bounded JSON history (`HistoryRecorder`)
//! - `presenter` - channel-backed `DecisionPresenter`
//! - `console` - line-oriented decision source

pub mod console;
pub mod history;
pub mod keys;
pub mod pending;
pub mod presenter;

pub use console::{ConsoleCommand, ConsoleDecisions};
pub use history::RequestHistory;
pub use keys::{DeviceKeyProvider, KeyStore, PRIVATE_KEY_FILE, PUBLIC_KEY_FILE};
pub use pending::{PendingGuard, PendingRequestRegistry, RegistryStats};
pub use presenter::{ChannelPresenter, PresenterEvent};
