//! Envelope Codec - JSON/base64 wire format.
//!
//! Request frame:
//!
//! ```text
//! {"encrypted_key": "<base64>", "encrypted_body": "<base64>"}
//! ```
//!
//! Decrypted request body: `{"source", "user", "service", "type"}`, all
//! strings. Response body before encryption: `{"device", "accepted"}`.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::domain::{Envelope, ProtocolError, RequestBody, ResponseBody};

/// Envelope as it appears on the wire
#[derive(Debug, Serialize, Deserialize)]
struct WireEnvelope {
    encrypted_key: String,
    encrypted_body: String,
}

/// Parse a request frame into raw ciphertext buffers.
///
/// # Errors
///
/// `ProtocolError::Parse` if the bytes are not a JSON object with both
/// string fields, or either field is not valid base64.
pub fn decode(raw: &[u8]) -> Result<Envelope, ProtocolError> {
    let wire: WireEnvelope = serde_json::from_slice(raw)
        .map_err(|e| ProtocolError::Parse(format!("envelope: {e}")))?;

    let encrypted_key = decode_field("encrypted_key", &wire.encrypted_key)?;
    let encrypted_body = decode_field("encrypted_body", &wire.encrypted_body)?;

    Ok(Envelope {
        encrypted_key,
        encrypted_body,
    })
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, ProtocolError> {
    STANDARD
        .decode(value)
        .map_err(|e| ProtocolError::Parse(format!("{name}: {e}")))
}

/// Serialize an envelope into a request frame (requester side).
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, ProtocolError> {
    let wire = WireEnvelope {
        encrypted_key: STANDARD.encode(&envelope.encrypted_key),
        encrypted_body: STANDARD.encode(&envelope.encrypted_body),
    };
    serde_json::to_vec(&wire).map_err(|e| ProtocolError::Parse(e.to_string()))
}

/// Parse the decrypted request payload.
pub fn decode_body(plain: &[u8]) -> Result<RequestBody, ProtocolError> {
    serde_json::from_slice(plain).map_err(|e| ProtocolError::Parse(format!("body: {e}")))
}

/// Serialize a request payload for encryption (requester side).
pub fn encode_body(body: &RequestBody) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(body).map_err(|e| ProtocolError::Parse(e.to_string()))
}

/// Serialize the verdict for encryption.
pub fn encode_response(response: &ResponseBody) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(response).map_err(|e| ProtocolError::Parse(e.to_string()))
}

/// Parse a decrypted verdict (requester side).
pub fn decode_response(plain: &[u8]) -> Result<ResponseBody, ProtocolError> {
    serde_json::from_slice(plain).map_err(|e| ProtocolError::Parse(format!("response: {e}")))
}
