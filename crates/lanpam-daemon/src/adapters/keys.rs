//! Device key adapters.
//!
//! - [`KeyStore`] loads the persistent key pair from a directory, creating
//!   it on first run
//! - [`DeviceKeyProvider`] implements the `KeyProvider` port over that pair

use lanpam_crypto::{CryptoError, DeviceKeyPair, DevicePublicKey, SessionKey};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::DaemonError;
use crate::ports::KeyProvider;

/// Private key file name inside the key directory (PKCS#8 PEM).
pub const PRIVATE_KEY_FILE: &str = "pam_private_key.pem";

/// Public key file name inside the key directory (SPKI PEM).
pub const PUBLIC_KEY_FILE: &str = "pam_public_key.pem";

/// Directory-backed storage for the device key pair.
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    /// Key store rooted at `dir`. Nothing is touched until a load.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the private key file.
    pub fn private_key_path(&self) -> PathBuf {
        self.dir.join(PRIVATE_KEY_FILE)
    }

    /// Path of the public key file.
    pub fn public_key_path(&self) -> PathBuf {
        self.dir.join(PUBLIC_KEY_FILE)
    }

    /// Load the stored key pair, generating and persisting a new one if the
    /// private key file does not exist yet.
    ///
    /// A private key that exists but cannot be parsed is an error; it is
    /// never silently replaced.
    pub fn load_or_generate(&self) -> Result<DeviceKeyPair, DaemonError> {
        let private_path = self.private_key_path();

        match fs::read_to_string(&private_path) {
            Ok(pem) => {
                let keys = DeviceKeyPair::from_pkcs8_pem(&pem)
                    .map_err(|e| key_error(&private_path, e))?;
                info!(path = %private_path.display(), "Loaded device key pair");
                Ok(keys)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.generate(),
            Err(e) => Err(key_error(&private_path, e)),
        }
    }

    fn generate(&self) -> Result<DeviceKeyPair, DaemonError> {
        info!(dir = %self.dir.display(), "No device key found, generating a new key pair");

        let keys = DeviceKeyPair::generate().map_err(|e| key_error(&self.dir, e))?;
        fs::create_dir_all(&self.dir).map_err(|e| key_error(&self.dir, e))?;

        let private_pem = keys
            .to_pkcs8_pem()
            .map_err(|e| key_error(&self.private_key_path(), e))?;
        write_private(&self.private_key_path(), private_pem.as_bytes())?;

        let public_pem = keys
            .public_key()
            .to_pem()
            .map_err(|e| key_error(&self.public_key_path(), e))?;
        fs::write(self.public_key_path(), public_pem)
            .map_err(|e| key_error(&self.public_key_path(), e))?;

        info!(path = %self.private_key_path().display(), "Stored new device key pair");
        Ok(keys)
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> Result<(), DaemonError> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(|e| key_error(path, e))?;
    file.write_all(contents).map_err(|e| key_error(path, e))
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> Result<(), DaemonError> {
    fs::write(path, contents).map_err(|e| key_error(path, e))
}

fn key_error(path: &Path, err: impl std::fmt::Display) -> DaemonError {
    DaemonError::KeyStore(format!("{}: {err}", path.display()))
}

/// `KeyProvider` backed by the in-memory device key pair.
#[derive(Debug, Clone)]
pub struct DeviceKeyProvider {
    keys: DeviceKeyPair,
}

impl DeviceKeyProvider {
    /// Wrap a loaded key pair.
    pub fn new(keys: DeviceKeyPair) -> Self {
        Self { keys }
    }

    /// Public key to hand out to requesters.
    pub fn public_key(&self) -> DevicePublicKey {
        self.keys.public_key()
    }
}

impl KeyProvider for DeviceKeyProvider {
    fn decrypt_key(&self, cipher_key: &[u8]) -> Result<SessionKey, CryptoError> {
        self.keys.decrypt_session_key(cipher_key)
    }
}
