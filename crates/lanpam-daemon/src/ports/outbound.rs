//! Outbound Ports (Driven Ports)
//!
//! Collaborators the connection handler depends on but does not own: key
//! material, the human-facing prompt, and request history.

use async_trait::async_trait;
use lanpam_crypto::{CryptoError, SessionKey};

use crate::domain::{Disposition, HistoryError, RequestBody, RequestId};

/// Hybrid decryption/encryption backed by the device key pair (Driven Port).
///
/// Stateless per call. Implementations must not log or persist key material.
pub trait KeyProvider: Send + Sync {
    /// Unwrap the RSA-encrypted session key.
    fn decrypt_key(&self, cipher_key: &[u8]) -> Result<SessionKey, CryptoError>;

    /// Decrypt a body under the session key.
    fn decrypt_body(&self, key: &SessionKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        lanpam_crypto::decrypt(key, ciphertext)
    }

    /// Encrypt a body under the session key.
    fn encrypt_body(&self, key: &SessionKey, plaintext: &[u8]) -> Vec<u8> {
        lanpam_crypto::encrypt(key, plaintext)
    }
}

/// Shows a pending request to whoever decides it (Driven Port).
///
/// `present` is called once per request after it is registered. The
/// presenter answers later, from any context, through
/// [`DecisionSink`](super::DecisionSink).
#[async_trait]
pub trait DecisionPresenter: Send + Sync {
    /// Surface a new request.
    async fn present(&self, request_id: RequestId, body: &RequestBody);

    /// The request settled without a verdict (requester left or timed out);
    /// remove any prompt still showing.
    async fn withdraw(&self, _request_id: RequestId) {}
}

/// Records completed requests (Driven Port).
#[async_trait]
pub trait HistoryRecorder: Send + Sync {
    /// Record one settled request. Called before the response is sent.
    async fn record(
        &self,
        request_id: RequestId,
        body: &RequestBody,
        disposition: Disposition,
    ) -> Result<(), HistoryError>;
}
