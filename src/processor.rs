//! Single-file encrypt/decrypt pipeline — the primary embedding surface.
//!
//! ```no_run
//! use sealbox::processor::{encrypt_file, decrypt_file};
//!
//! let sealed = encrypt_file("correct-horse", b"%PDF-1.7 ...", "report.pdf", "application/pdf")?;
//! assert_eq!(sealed.suggested_name, "report.pdf.enc");
//!
//! let opened = decrypt_file("correct-horse", &sealed.envelope, &sealed.suggested_name)?;
//! assert_eq!(opened.metadata.ext, "pdf");
//! assert_eq!(opened.suggested_name, "report.pdf");
//! # Ok::<(), sealbox::processor::ProcessError>(())
//! ```
//!
//! Both flows are pure functions of their inputs.  Nothing is retried and no
//! partial output is returned: either the whole envelope / plaintext comes
//! back or an error does.

use thiserror::Error;
use tracing::{debug, warn};

use crate::crypto::{self, CryptoError, DEFAULT_ITERATIONS, MIN_ITERATIONS};
use crate::envelope::{Envelope, EnvelopeError};
use crate::metadata::FileMetadata;
use crate::naming;

// ── ProcessorOptions ──────────────────────────────────────────────────────────

/// Configuration shared by encryption and decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorOptions {
    /// PBKDF2 iteration count.  Not recorded in the envelope, so a file must
    /// be decrypted with the count it was encrypted with.
    pub iterations:               u32,
    /// Reject decryption inputs whose name lacks the `.enc` suffix.
    pub require_container_suffix: bool,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            iterations:               DEFAULT_ITERATIONS,
            require_container_suffix: true,
        }
    }
}

impl ProcessorOptions {
    pub fn validate(&self) -> Result<(), ProcessError> {
        if self.iterations < MIN_ITERATIONS {
            return Err(ProcessError::InvalidConfig(format!(
                "iterations must be at least {MIN_ITERATIONS}, got {}",
                self.iterations
            )));
        }
        Ok(())
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProcessError {
    #[error("Please enter a password")]
    EmptyPassword,
    #[error("Please select a non-empty file")]
    EmptyContent,
    #[error("Not an encrypted file: '{name}' does not end with .enc")]
    NotAContainer { name: String },
    #[error("Not a valid encrypted file: {0}")]
    MalformedEnvelope(#[from] EnvelopeError),
    #[error("Decryption failed: invalid password or corrupted file")]
    DecryptionFailed,
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ProcessError {
    /// True for failures raised by input checks before any crypto work.
    pub fn is_input_validation(&self) -> bool {
        matches!(self, ProcessError::EmptyPassword | ProcessError::EmptyContent)
    }
}

impl From<CryptoError> for ProcessError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::EncryptionFailed => ProcessError::EncryptionFailed,
            CryptoError::DecryptionFailed => ProcessError::DecryptionFailed,
        }
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EncryptedFile {
    pub envelope:       Vec<u8>,
    pub suggested_name: String,
}

#[derive(Debug, Clone)]
pub struct DecryptedFile {
    pub content:        Vec<u8>,
    pub metadata:       FileMetadata,
    pub suggested_name: String,
}

// ── Encrypt ───────────────────────────────────────────────────────────────────

/// Encrypt `content` with default options.
pub fn encrypt_file(
    password:      &str,
    content:       &[u8],
    original_name: &str,
    original_type: &str,
) -> Result<EncryptedFile, ProcessError> {
    encrypt_file_with(password, content, original_name, original_type, &ProcessorOptions::default())
}

pub fn encrypt_file_with(
    password:      &str,
    content:       &[u8],
    original_name: &str,
    original_type: &str,
    opts:          &ProcessorOptions,
) -> Result<EncryptedFile, ProcessError> {
    opts.validate()?;
    if password.is_empty() {
        warn!(file = original_name, "encryption rejected: empty password");
        return Err(ProcessError::EmptyPassword);
    }
    if content.is_empty() {
        warn!(file = original_name, "encryption rejected: empty content");
        return Err(ProcessError::EmptyContent);
    }

    let salt = crypto::generate_salt();
    let key = crypto::derive_key(password, &salt, opts.iterations);
    let nonce = crypto::generate_nonce();
    debug!(file = original_name, iterations = opts.iterations, "key derived");

    let metadata = FileMetadata::for_file(original_name, original_type, content.len() as u64)
        .to_bytes()
        .map_err(|_| ProcessError::EncryptionFailed)?;
    let aad = Envelope::header_bytes(&salt, &nonce, &metadata)
        .map_err(|_| ProcessError::EncryptionFailed)?;

    let ciphertext = crypto::seal(content, &key, &nonce, &aad)?;
    drop(key);

    let envelope = Envelope { salt, nonce, metadata, ciphertext }
        .encode()
        .map_err(|_| ProcessError::EncryptionFailed)?;
    debug!(
        file = original_name,
        plaintext_len = content.len(),
        envelope_len = envelope.len(),
        "envelope sealed"
    );

    Ok(EncryptedFile {
        envelope,
        suggested_name: naming::container_name(original_name),
    })
}

// ── Decrypt ───────────────────────────────────────────────────────────────────

/// Decrypt a container with default options.
pub fn decrypt_file(
    password:      &str,
    envelope:      &[u8],
    original_name: &str,
) -> Result<DecryptedFile, ProcessError> {
    decrypt_file_with(password, envelope, original_name, &ProcessorOptions::default())
}

pub fn decrypt_file_with(
    password:      &str,
    envelope:      &[u8],
    original_name: &str,
    opts:          &ProcessorOptions,
) -> Result<DecryptedFile, ProcessError> {
    opts.validate()?;
    if password.is_empty() {
        warn!(file = original_name, "decryption rejected: empty password");
        return Err(ProcessError::EmptyPassword);
    }
    if opts.require_container_suffix && !naming::has_container_suffix(original_name) {
        warn!(file = original_name, "decryption rejected: missing .enc suffix");
        return Err(ProcessError::NotAContainer { name: original_name.to_owned() });
    }
    open_envelope(password, envelope, original_name, opts.iterations)
}

// The suggested name falls back to `decrypted_<name>` when `original_name`
// has no `.enc` suffix.
fn open_envelope(
    password:      &str,
    envelope:      &[u8],
    original_name: &str,
    iterations:    u32,
) -> Result<DecryptedFile, ProcessError> {
    let parsed = Envelope::decode(envelope).map_err(|e| {
        warn!(file = original_name, error = %e, "malformed envelope");
        ProcessError::MalformedEnvelope(e)
    })?;
    debug!(
        file = original_name,
        meta_len = parsed.metadata.len(),
        ciphertext_len = parsed.ciphertext.len(),
        "envelope parsed"
    );

    let aad = parsed.associated_data()?;
    let key = crypto::derive_key(password, &parsed.salt, iterations);
    let content = crypto::open(&parsed.ciphertext, &key, &parsed.nonce, &aad)?;
    drop(key);

    // The metadata was authenticated above, so a parse failure here means the
    // envelope was produced by something other than this crate.
    let metadata = FileMetadata::from_bytes(&parsed.metadata)
        .map_err(|e| ProcessError::MalformedEnvelope(EnvelopeError::InvalidMetadata(e.to_string())))?;
    if metadata.size != content.len() as u64 {
        warn!(
            file = original_name,
            recorded = metadata.size,
            actual = content.len(),
            "recorded size does not match plaintext"
        );
        return Err(ProcessError::DecryptionFailed);
    }
    debug!(file = original_name, plaintext_len = content.len(), "envelope opened");

    Ok(DecryptedFile {
        content,
        metadata,
        suggested_name: naming::decrypted_name(original_name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::HEADER_LEN;

    fn fast() -> ProcessorOptions {
        ProcessorOptions { iterations: MIN_ITERATIONS, ..Default::default() }
    }

    #[test]
    fn options_reject_weak_iteration_counts() {
        let opts = ProcessorOptions { iterations: MIN_ITERATIONS - 1, ..Default::default() };
        assert!(matches!(opts.validate(), Err(ProcessError::InvalidConfig(_))));
        assert!(ProcessorOptions::default().validate().is_ok());
        assert!(matches!(
            encrypt_file_with("pw", b"x", "a", "", &opts),
            Err(ProcessError::InvalidConfig(_))
        ));
    }

    #[test]
    fn input_validation_happens_first() {
        let e = encrypt_file_with("", b"data", "a.txt", "text/plain", &fast()).unwrap_err();
        assert_eq!(e, ProcessError::EmptyPassword);
        assert!(e.is_input_validation());

        let e = encrypt_file_with("pw", b"", "a.txt", "text/plain", &fast()).unwrap_err();
        assert_eq!(e, ProcessError::EmptyContent);
        assert!(e.is_input_validation());

        // Garbage envelope: the password check must win over parsing.
        let e = decrypt_file_with("", b"junk", "a.txt.enc", &fast()).unwrap_err();
        assert_eq!(e, ProcessError::EmptyPassword);
    }

    #[test]
    fn suffix_is_checked_before_parsing() {
        let e = decrypt_file_with("pw", b"junk", "a.txt", &fast()).unwrap_err();
        assert_eq!(e, ProcessError::NotAContainer { name: "a.txt".into() });
        assert!(!e.is_input_validation());
    }

    #[test]
    fn lenient_decrypt_uses_fallback_name() {
        let sealed = encrypt_file_with("pw", b"hello", "note.txt", "text/plain", &fast()).unwrap();
        let opts = ProcessorOptions { require_container_suffix: false, ..fast() };
        let opened = decrypt_file_with("pw", &sealed.envelope, "download", &opts).unwrap();
        assert_eq!(opened.content, b"hello");
        assert_eq!(opened.suggested_name, "decrypted_download");
    }

    #[test]
    fn short_envelope_is_malformed() {
        let e = decrypt_file_with("pw", &[0u8; HEADER_LEN - 1], "x.enc", &fast()).unwrap_err();
        assert!(matches!(e, ProcessError::MalformedEnvelope(EnvelopeError::TooShort { .. })));
    }

    #[test]
    fn header_tamper_is_detected() {
        let sealed = encrypt_file_with("pw", b"hello", "note.txt", "text/plain", &fast()).unwrap();
        // Flip a byte inside the metadata block (just past the fixed header).
        let mut env = sealed.envelope.clone();
        env[HEADER_LEN + 2] ^= 0x01;
        assert_eq!(
            decrypt_file_with("pw", &env, "note.txt.enc", &fast()).unwrap_err(),
            ProcessError::DecryptionFailed
        );
        // And inside the salt.
        let mut env = sealed.envelope;
        env[0] ^= 0x80;
        assert_eq!(
            decrypt_file_with("pw", &env, "note.txt.enc", &fast()).unwrap_err(),
            ProcessError::DecryptionFailed
        );
    }

    #[test]
    fn iteration_mismatch_fails_like_a_wrong_password() {
        let sealed = encrypt_file_with("pw", b"hello", "n.txt", "", &fast()).unwrap();
        let other = ProcessorOptions { iterations: MIN_ITERATIONS + 1, ..fast() };
        assert_eq!(
            decrypt_file_with("pw", &sealed.envelope, &sealed.suggested_name, &other).unwrap_err(),
            ProcessError::DecryptionFailed
        );
    }
}
