//! Symmetric encryption of individual secret values.
//!
//! Values are encrypted with AES-256-GCM under a single installation
//! key and stored as `enc::<base64(nonce || ciphertext)>`. The prefix
//! tag lets plaintext and ciphertext coexist in one store document, and
//! a fresh random nonce per call means the same plaintext encrypts to
//! different ciphertexts while always decrypting back identically.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

use crate::core::constants;
use crate::error::{CryptoError, Error, Result};

/// Size of the installation encryption key in bytes (256-bit AES).
pub const KEY_SIZE: usize = 32;

/// Size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// The installation's symmetric encryption key.
///
/// Key material is zeroized on drop and validated to the fixed length
/// at construction. The storage form (config file, reserved store
/// entry) is standard base64.
pub struct EncryptionKey(Zeroizing<[u8; KEY_SIZE]>);

impl EncryptionKey {
    /// Generate a fresh random key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; KEY_SIZE]);
        OsRng.fill_bytes(bytes.as_mut());
        Self(bytes)
    }

    /// Parse a key from its base64 storage form.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKey` if the encoding is invalid or
    /// the decoded length is not exactly [`KEY_SIZE`] bytes.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let mut decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("not valid base64: {}", e)))?;

        if decoded.len() != KEY_SIZE {
            decoded.zeroize();
            return Err(CryptoError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_SIZE,
                decoded.len()
            ))
            .into());
        }

        let mut bytes = Zeroizing::new([0u8; KEY_SIZE]);
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self(bytes))
    }

    /// Base64 storage form of the key.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0.as_ref())
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.0.as_ref()))
    }
}

// Key material must never leak through Debug formatting.
impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// Check whether a value carries the encrypted tag.
///
/// A pure prefix test, never a parse attempt.
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(constants::ENCRYPTED_PREFIX)
}

/// Check whether a raw store value is tagged as encrypted.
///
/// Returns `false` for any non-string value (null, number, bool)
/// without failing.
pub fn is_encrypted_value(value: &serde_json::Value) -> bool {
    value.as_str().map(is_encrypted).unwrap_or(false)
}

/// Encrypt a plaintext value, producing a tagged ciphertext string.
///
/// # Errors
///
/// Returns `CryptoError::EncryptionFailed` if the cipher fails.
pub fn encrypt(plaintext: &str, key: &EncryptionKey) -> Result<String> {
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = key
        .cipher()
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(format!("{}", e)))?;

    let mut payload = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    payload.extend_from_slice(&nonce_bytes);
    payload.extend_from_slice(&ciphertext);

    Ok(format!(
        "{}{}",
        constants::ENCRYPTED_PREFIX,
        STANDARD.encode(payload)
    ))
}

/// Decrypt a tagged ciphertext string back to plaintext.
///
/// `name` is the owning secret key, used only to attribute failures in
/// the error message.
///
/// # Errors
///
/// Returns `CryptoError::DecryptionFailed` if the tag is missing, the
/// payload is malformed, or the key is wrong.
pub fn decrypt(tagged: &str, key: &EncryptionKey, name: &str) -> Result<String> {
    let payload = tagged
        .strip_prefix(constants::ENCRYPTED_PREFIX)
        .ok_or_else(|| decryption_failed(name, "value is not tagged as encrypted"))?;

    let decoded = STANDARD
        .decode(payload)
        .map_err(|e| decryption_failed(name, format!("payload is not valid base64: {}", e)))?;

    if decoded.len() <= NONCE_SIZE {
        return Err(decryption_failed(name, "payload is truncated"));
    }

    let (nonce_bytes, ciphertext) = decoded.split_at(NONCE_SIZE);
    let plaintext = key
        .cipher()
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| decryption_failed(name, "wrong key or corrupted payload"))?;

    String::from_utf8(plaintext).map_err(|e| decryption_failed(name, format!("UTF-8 error: {}", e)))
}

fn decryption_failed(name: &str, reason: impl Into<String>) -> Error {
    CryptoError::DecryptionFailed {
        name: name.to_string(),
        reason: reason.into(),
    }
    .into()
}
