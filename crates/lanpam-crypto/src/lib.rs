//! # LAN-PAM Crypto - Hybrid Envelope Cryptography
//!
//! The requester generates a one-time session key per request, encrypts the
//! request body with it and transports the key under this device's RSA public
//! key. The device answers with a body encrypted under the same session key.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `asymmetric` | RSA-2048, PKCS#1 v1.5 | Session key transport |
//! | `symmetric` | AES-256-ECB, PKCS#7 | Request/response bodies |
//!
//! ## Wire Compatibility
//!
//! The mode and padding choices are dictated by the deployed requester and
//! are reproduced exactly. ECB without a MAC gives no integrity protection;
//! a protocol revision should move to an AEAD with a random nonce.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod asymmetric;
pub mod errors;
pub mod symmetric;

// Re-exports
pub use asymmetric::{DeviceKeyPair, DevicePublicKey, RSA_KEY_BITS};
pub use errors::CryptoError;
pub use symmetric::{decrypt, encrypt, SessionKey, BLOCK_SIZE, SESSION_KEY_LEN};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
