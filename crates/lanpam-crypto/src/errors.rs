//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Ciphertext is not a whole number of cipher blocks
    #[error("Invalid ciphertext length: {actual} is not a multiple of {block_size}")]
    InvalidCiphertextLength {
        /// Block size the ciphertext must align to
        block_size: usize,
        /// Actual ciphertext length in bytes
        actual: usize,
    },

    /// Padding check failed after block decryption
    #[error("Invalid padding")]
    InvalidPadding,

    /// Invalid public key
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Invalid private key
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Key generation failed
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// Key encoding (PEM/DER/base64) failed
    #[error("Key encoding failed: {0}")]
    Encoding(String),
}
