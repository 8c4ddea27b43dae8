//! Protocol and bookkeeping types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RequestId;

/// Outer wire message: an RSA-wrapped session key plus the AES-encrypted body.
///
/// Holds raw bytes; the base64 form only exists on the wire (see `codec`).
#[derive(Clone, PartialEq, Eq)]
pub struct Envelope {
    /// RSA ciphertext of the session key
    pub encrypted_key: Vec<u8>,
    /// AES ciphertext of the JSON [`RequestBody`]
    pub encrypted_body: Vec<u8>,
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("encrypted_key_len", &self.encrypted_key.len())
            .field("encrypted_body_len", &self.encrypted_body.len())
            .finish()
    }
}

/// Decrypted authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Display name of the machine asking
    pub source: String,
    /// PAM user
    pub user: String,
    /// PAM service (e.g. `sudo`, `sshd`)
    pub service: String,
    /// PAM type (e.g. `auth`, `open_session`)
    #[serde(rename = "type")]
    pub request_type: String,
}

/// Verdict sent back to the requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBody {
    /// Display name of this device
    pub device: String,
    /// Whether the request is allowed
    pub accepted: bool,
}

/// How a pending request settled, as seen by the waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An external decision source answered
    Resolved {
        /// The verdict
        accepted: bool,
    },
    /// The requester went away before a verdict
    Cancelled,
    /// The decision timeout elapsed first
    Expired,
    /// The identifier was never created or was already consumed
    Unknown,
}

impl Outcome {
    /// Boolean verdict; everything but an explicit acceptance denies.
    pub fn accepted(self) -> bool {
        matches!(self, Outcome::Resolved { accepted: true })
    }
}

/// Final classification of a request, recorded in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    /// Accepted by the decision maker
    Accepted,
    /// Rejected by the decision maker
    Rejected,
    /// Requester disconnected before a verdict
    Cancelled,
    /// No verdict within the configured decision timeout
    Expired,
}

impl From<Outcome> for Disposition {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Resolved { accepted: true } => Disposition::Accepted,
            Outcome::Resolved { accepted: false } | Outcome::Unknown => Disposition::Rejected,
            Outcome::Cancelled => Disposition::Cancelled,
            Outcome::Expired => Disposition::Expired,
        }
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Disposition::Accepted => "ACCEPTED",
            Disposition::Rejected => "REJECTED",
            Disposition::Cancelled => "CANCELLED",
            Disposition::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// One completed request, newest first in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Request identifier
    pub id: RequestId,
    /// When the request settled
    pub timestamp: DateTime<Utc>,
    /// Requesting machine
    pub source: String,
    /// PAM user
    pub user: String,
    /// PAM service
    pub service: String,
    /// PAM type
    #[serde(rename = "type")]
    pub request_type: String,
    /// Final disposition
    pub status: Disposition,
}

impl HistoryEntry {
    /// Build an entry stamped with the current time.
    pub fn new(id: RequestId, body: &RequestBody, status: Disposition) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            source: body.source.clone(),
            user: body.user.clone(),
            service: body.service.clone(),
            request_type: body.request_type.clone(),
            status,
        }
    }
}
