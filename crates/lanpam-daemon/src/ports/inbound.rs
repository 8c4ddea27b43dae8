//! Inbound Ports (Driving Ports)
//!
//! The interface an external decision source (a prompt, a notification
//! action, a test) uses to answer a pending request. Callers only ever hold
//! a [`RequestId`], never a handle to the waiting connection.

use crate::domain::RequestId;

/// Accepts verdicts for pending requests (Driving Port).
///
/// Implementations must be callable from any thread or task, concurrently
/// with the connection that is waiting.
pub trait DecisionSink: Send + Sync {
    /// Post a verdict.
    ///
    /// Only the first settlement of an identifier takes effect; later calls
    /// and calls for unknown identifiers are no-ops. Returns whether this
    /// call settled the request.
    fn resolve(&self, request_id: &RequestId, accepted: bool) -> bool;
}
