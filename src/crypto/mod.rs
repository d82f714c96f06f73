//! AES-256-GCM sealing and PBKDF2-HMAC-SHA256 key derivation for envelopes.
//!
//! Key derivation: PBKDF2-SHA256(password, salt=envelope salt) → 32-byte key
//! Encryption:     AES-256-GCM, caller-supplied 12-byte nonce, envelope
//!                 header bytes as associated data
//!
//! Sealed payload layout: [ ciphertext | GCM tag (16 B) ]

pub mod kdf;

pub use kdf::{derive_key, DerivedKey, DEFAULT_ITERATIONS, MIN_ITERATIONS};

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

/// Byte length of the derived AES-256 key.
pub const KEY_LEN: usize = 32;
/// Byte length of the per-envelope PBKDF2 salt.
pub const SALT_LEN: usize = 16;
/// Byte length of the AES-GCM nonce.
pub const NONCE_LEN: usize = 12;
/// Byte length of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,
    /// Tag mismatch, truncated ciphertext and wrong key all collapse here.
    #[error("Decryption failed: wrong password or corrupted data")]
    DecryptionFailed,
}

/// Fresh random salt from the OS CSPRNG.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Fresh random nonce from the OS CSPRNG.  Call exactly once per seal.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypt `plaintext` with AES-256-GCM, authenticating `aad` alongside it.
///
/// Returns `ciphertext || GCM-tag (16 B)`; the output is always exactly
/// `plaintext.len() + TAG_LEN` bytes.
pub fn seal(
    plaintext: &[u8],
    key:       &DerivedKey,
    nonce:     &[u8; NONCE_LEN],
    aad:       &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed)?;
    cipher
        .encrypt(Nonce::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::EncryptionFailed)
}

/// Decrypt a payload produced by [`seal`] with the same key, nonce and `aad`.
///
/// Every failure is reported as [`CryptoError::DecryptionFailed`]; callers
/// cannot tell a wrong password from a damaged envelope.
pub fn open(
    ciphertext: &[u8],
    key:        &DerivedKey,
    nonce:      &[u8; NONCE_LEN],
    aad:        &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < TAG_LEN {
        return Err(CryptoError::DecryptionFailed);
    }
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| CryptoError::DecryptionFailed)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::DecryptionFailed)
}
