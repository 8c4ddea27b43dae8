//! Pending Request Registry - bridges a waiting connection and an
//! out-of-band decision source.
//!
//! Flow:
//! 1. Connection handler calls `create()` and gets a `RequestId`
//! 2. Handler hands the id to the presenter
//! 3. Presenter (any task/thread) calls `resolve()`; the disconnect monitor
//!    calls `cancel()`; the decision timer calls `expire()`
//! 4. Handler's `wait()` returns whichever settlement came first
//!
//! Each entry owns a oneshot sender. Settling removes the entry and consumes
//! the sender, so an id can settle at most once; the waiting receiver is
//! parked separately so a verdict posted before `wait()` is not lost.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::domain::{Outcome, RequestId};
use crate::ports::DecisionSink;

/// A request that has not settled yet
struct PendingEntry {
    /// Channel to deliver the settlement
    sender: oneshot::Sender<Outcome>,
    /// When the entry was created
    created_at: Instant,
}

/// Statistics for the registry
#[derive(Debug, Default)]
pub struct RegistryStats {
    /// Total requests created
    pub total_registered: AtomicU64,
    /// Total requests settled by a verdict
    pub total_resolved: AtomicU64,
    /// Total requests cancelled by disconnect
    pub total_cancelled: AtomicU64,
    /// Total requests expired by the decision timeout
    pub total_expired: AtomicU64,
}

/// Concurrency-safe map of request id to pending settlement.
///
/// Construct one per listener and share it (`Arc`) with the connection
/// handler and the decision source.
#[derive(Default)]
pub struct PendingRequestRegistry {
    /// Unsettled entries
    pending: DashMap<RequestId, PendingEntry>,
    /// Receivers not yet claimed by `wait()`
    waiters: DashMap<RequestId, oneshot::Receiver<Outcome>>,
    /// Statistics
    stats: Arc<RegistryStats>,
}

impl PendingRequestRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh identifier with a pending entry.
    ///
    /// Every id returned here must eventually be passed to `wait()`.
    pub fn create(&self) -> RequestId {
        let request_id = RequestId::new();
        let (tx, rx) = oneshot::channel();

        self.waiters.insert(request_id, rx);
        self.pending.insert(
            request_id,
            PendingEntry {
                sender: tx,
                created_at: Instant::now(),
            },
        );
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(request_id = %request_id, "Registered pending request");
        request_id
    }

    /// Wait until `request_id` settles and return how it settled.
    ///
    /// Returns `Outcome::Unknown` immediately for an id that was never
    /// created or whose outcome was already claimed by an earlier `wait()`.
    pub async fn wait(&self, request_id: &RequestId) -> Outcome {
        let Some((_, receiver)) = self.waiters.remove(request_id) else {
            trace!(request_id = %request_id, "Wait on unknown request id");
            return Outcome::Unknown;
        };

        // The sender only disappears unsettled if the registry is torn down.
        receiver.await.unwrap_or(Outcome::Cancelled)
    }

    /// Settle with a verdict. Returns whether this call settled the entry.
    pub fn resolve(&self, request_id: &RequestId, accepted: bool) -> bool {
        self.settle(
            request_id,
            Outcome::Resolved { accepted },
            &self.stats.total_resolved,
        )
    }

    /// Settle as abandoned by the requester.
    pub fn cancel(&self, request_id: &RequestId) -> bool {
        self.settle(request_id, Outcome::Cancelled, &self.stats.total_cancelled)
    }

    /// Settle as timed out.
    pub fn expire(&self, request_id: &RequestId) -> bool {
        self.settle(request_id, Outcome::Expired, &self.stats.total_expired)
    }

    fn settle(&self, request_id: &RequestId, outcome: Outcome, counter: &AtomicU64) -> bool {
        let Some((_, entry)) = self.pending.remove(request_id) else {
            trace!(request_id = %request_id, ?outcome, "Settlement for unknown or settled request ignored");
            return false;
        };

        counter.fetch_add(1, Ordering::Relaxed);

        // A dropped receiver means the waiter already went away; the entry is
        // settled either way.
        let _ = entry.sender.send(outcome);

        debug!(
            request_id = %request_id,
            ?outcome,
            pending_ms = entry.created_at.elapsed().as_millis() as u64,
            "Settled pending request"
        );
        true
    }

    /// Tie the lifetime of `request_id` to the returned guard.
    ///
    /// If the guard is dropped before [`PendingGuard::disarm`] (the waiting
    /// future was dropped or a collaborator panicked), the entry is
    /// cancelled and its parked receiver discarded.
    pub fn guard(&self, request_id: RequestId) -> PendingGuard<'_> {
        PendingGuard {
            registry: self,
            request_id,
            armed: true,
        }
    }

    /// Drop every trace of `request_id`, settling it as cancelled if it was
    /// still pending.
    fn discard(&self, request_id: &RequestId) {
        self.cancel(request_id);
        if self.waiters.remove(request_id).is_some() {
            debug!(request_id = %request_id, "Discarded unclaimed pending request");
        }
    }

    /// Get number of currently unsettled requests
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of receivers not yet claimed by `wait()`
    pub fn unclaimed_count(&self) -> usize {
        self.waiters.len()
    }

    /// Check if a request id is still unsettled
    pub fn is_pending(&self, request_id: &RequestId) -> bool {
        self.pending.contains_key(request_id)
    }

    /// Age of an unsettled request
    pub fn pending_for(&self, request_id: &RequestId) -> Option<Duration> {
        self.pending
            .get(request_id)
            .map(|entry| entry.created_at.elapsed())
    }

    /// Get statistics
    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }
}

/// Cleans up a registered request unless disarmed. See
/// [`PendingRequestRegistry::guard`].
#[must_use = "dropping the guard immediately cancels the request"]
pub struct PendingGuard<'a> {
    registry: &'a PendingRequestRegistry,
    request_id: RequestId,
    armed: bool,
}

impl PendingGuard<'_> {
    /// The request settled and its outcome was claimed.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.registry.discard(&self.request_id);
        }
    }
}

impl DecisionSink for PendingRequestRegistry {
    fn resolve(&self, request_id: &RequestId, accepted: bool) -> bool {
        PendingRequestRegistry::resolve(self, request_id, accepted)
    }
}
