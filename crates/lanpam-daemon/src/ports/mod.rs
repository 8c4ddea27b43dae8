//! Ports Layer
//!
//! Defines the interfaces (traits) for:
//! - Driving Ports (inbound) - verdicts posted by the decision source
//! - Driven Ports (outbound) - keys, presentation and history

pub mod inbound;
pub mod outbound;

pub use inbound::DecisionSink;
pub use outbound::{DecisionPresenter, HistoryRecorder, KeyProvider};
