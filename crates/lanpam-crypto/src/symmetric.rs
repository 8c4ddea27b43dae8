//! # Symmetric Encryption
//!
//! AES-256 in ECB mode with PKCS#7 padding (`AES/ECB/PKCS5Padding` on the
//! JVM side of the protocol).
//!
//! ## Security Properties
//!
//! - No IV and no authentication tag: identical plaintext blocks produce
//!   identical ciphertext blocks and tampering is only caught by the padding
//!   check or by the JSON parser downstream.
//! - Each request uses a fresh session key, so keys are never reused across
//!   requests.

use crate::CryptoError;
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyInit};
use zeroize::Zeroize;

type Aes256EcbEnc = ecb::Encryptor<aes::Aes256>;
type Aes256EcbDec = ecb::Decryptor<aes::Aes256>;

/// Session key length in bytes (AES-256).
pub const SESSION_KEY_LEN: usize = 32;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// One-time session key (256-bit).
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SessionKey([u8; SESSION_KEY_LEN]);

impl SessionKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; SESSION_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice that must be exactly [`SESSION_KEY_LEN`] bytes.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyLength` for any other length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; SESSION_KEY_LEN] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: SESSION_KEY_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(array))
    }

    /// Generate random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_KEY_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// Encrypt plaintext with AES-256-ECB/PKCS#7.
///
/// The output is always a non-empty multiple of [`BLOCK_SIZE`]; an empty
/// plaintext yields one full padding block.
pub fn encrypt(key: &SessionKey, plaintext: &[u8]) -> Vec<u8> {
    Aes256EcbEnc::new(key.as_bytes().into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypt AES-256-ECB/PKCS#7 ciphertext.
///
/// # Errors
///
/// - `CryptoError::InvalidCiphertextLength` if the input is empty or not a
///   multiple of the block size
/// - `CryptoError::InvalidPadding` if the trailing padding is malformed
pub fn decrypt(key: &SessionKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidCiphertextLength {
            block_size: BLOCK_SIZE,
            actual: ciphertext.len(),
        });
    }

    Aes256EcbDec::new(key.as_bytes().into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::InvalidPadding)
}
