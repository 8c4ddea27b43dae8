//! Requester side of the protocol.
//!
//! Used by the `lanpam-exec` PAM helper and by tests that drive a live
//! listener. One call is one connection: build an envelope under a fresh
//! session key, send it, read the encrypted verdict.

use lanpam_crypto::{CryptoError, DevicePublicKey, SessionKey};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::codec;
use crate::domain::{
    ConfigError, Envelope, ProtocolError, RequestBody, ResponseBody, MAX_REQUEST_SIZE,
};

/// Largest response read from a device.
pub const RESPONSE_BUFFER_SIZE: usize = 512;

/// Requester errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// TCP connect failed
    #[error("Failed to connect: {0}")]
    Connect(#[source] std::io::Error),

    /// Socket failure after connecting
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encryption of the request or decryption of the verdict failed
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Request or verdict could not be encoded/decoded
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The envelope would not fit in the listener's single read
    #[error("Request is {size} bytes, limit is {limit}")]
    RequestTooLarge {
        /// Encoded size
        size: usize,
        /// Listener limit
        limit: usize,
    },

    /// The device closed the connection without a verdict
    #[error("Device closed the connection without responding")]
    NoResponse,

    /// No verdict within the caller's deadline
    #[error("Timed out waiting for a verdict")]
    Timeout,
}

impl ClientError {
    /// Whether the device connection produced no valid verdict: an empty
    /// reply or one that did not decrypt and parse.
    pub fn is_bad_response(&self) -> bool {
        matches!(
            self,
            ClientError::Crypto(_) | ClientError::Protocol(_) | ClientError::NoResponse
        )
    }
}

/// Requester configuration (JSON).
///
/// ```json
/// {
///   "source_name": "build-box",
///   "devices": [
///     {"name": "Phone", "ip_address": "192.168.1.20:4200", "public_key": "MIIBIjAN..."}
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RequesterConfig {
    /// Name shown to the decider as the request source
    pub source_name: String,
    /// Devices asked concurrently
    pub devices: Vec<DeviceEntry>,
}

/// One device a requester can ask.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceEntry {
    /// Display name
    pub name: String,
    /// `host:port` of the device listener
    pub ip_address: String,
    /// Base64 DER public key printed by `lanpam-daemon --print-public-key`
    pub public_key: String,
}

impl RequesterConfig {
    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse from a JSON string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// An encoded request plus the session key needed to read its verdict.
#[derive(Debug)]
pub struct PreparedRequest {
    /// Session key the verdict will be encrypted under
    pub session_key: SessionKey,
    /// Wire frame to send
    pub frame: Vec<u8>,
}

/// Encrypt `body` for the device holding `public_key`.
///
/// # Errors
///
/// `ClientError::RequestTooLarge` if the frame reaches [`MAX_REQUEST_SIZE`].
pub fn prepare_request(
    public_key: &DevicePublicKey,
    body: &RequestBody,
) -> Result<PreparedRequest, ClientError> {
    let session_key = SessionKey::generate();
    let envelope = Envelope {
        encrypted_key: public_key.encrypt_session_key(&session_key)?,
        encrypted_body: lanpam_crypto::encrypt(&session_key, &codec::encode_body(body)?),
    };
    let frame = codec::encode(&envelope)?;

    if frame.len() >= MAX_REQUEST_SIZE {
        return Err(ClientError::RequestTooLarge {
            size: frame.len(),
            limit: MAX_REQUEST_SIZE,
        });
    }

    Ok(PreparedRequest { session_key, frame })
}

/// Decrypt and parse a verdict frame.
pub fn open_response(session_key: &SessionKey, raw: &[u8]) -> Result<ResponseBody, ClientError> {
    if raw.is_empty() {
        return Err(ClientError::NoResponse);
    }
    let plain = lanpam_crypto::decrypt(session_key, raw)?;
    Ok(codec::decode_response(&plain)?)
}

/// Ask the device at `addr` for a verdict on `body`.
///
/// Blocks until the device answers, closes the connection, or `timeout`
/// (if any) elapses.
pub async fn request_decision<A>(
    addr: A,
    public_key: &DevicePublicKey,
    body: &RequestBody,
    timeout: Option<Duration>,
) -> Result<ResponseBody, ClientError>
where
    A: ToSocketAddrs,
{
    let exchange = exchange(addr, public_key, body);
    match timeout {
        Some(limit) => tokio::time::timeout(limit, exchange)
            .await
            .map_err(|_| ClientError::Timeout)?,
        None => exchange.await,
    }
}

async fn exchange<A>(
    addr: A,
    public_key: &DevicePublicKey,
    body: &RequestBody,
) -> Result<ResponseBody, ClientError>
where
    A: ToSocketAddrs,
{
    let request = prepare_request(public_key, body)?;

    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(ClientError::Connect)?;
    stream.set_nodelay(true)?;
    stream.write_all(&request.frame).await?;
    debug!(bytes = request.frame.len(), "Sent request");

    let mut buf = [0u8; RESPONSE_BUFFER_SIZE];
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    debug!(bytes = filled, "Received response");

    open_response(&request.session_key, &buf[..filled])
}
