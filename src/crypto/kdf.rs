//! PBKDF2-HMAC-SHA256 key derivation.
//!
//! key = PBKDF2(HMAC-SHA256, password, salt, iterations) → 32 bytes
//!
//! The iteration count is not stored in the envelope, so encryption and
//! decryption must agree on it.  [`DEFAULT_ITERATIONS`] is the value every
//! envelope written with default options uses.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{KEY_LEN, SALT_LEN};

/// Iteration count used unless the caller configures another one.
pub const DEFAULT_ITERATIONS: u32 = 100_000;
/// Lowest iteration count a processor will accept.
pub const MIN_ITERATIONS: u32 = 10_000;

/// A 256-bit key derived from a password.  Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],
}

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive a 256-bit key from `password` and a per-envelope `salt`.
///
/// Deterministic and infallible.  An empty password still yields a key;
/// rejecting it is the processor's job.
pub fn derive_key(password: &str, salt: &[u8; SALT_LEN], iterations: u32) -> DerivedKey {
    let mut bytes = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut bytes);
    DerivedKey { bytes }
}
