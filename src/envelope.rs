//! Binary envelope layout.  All integers are little-endian; this is a
//! compatibility invariant and must never change.
//!
//! ```text
//! offset  size      field
//!      0    16      salt
//!     16    12      nonce
//!     28     4      meta_len   (u32 LE)
//!     32  meta_len  metadata   (serialized FileMetadata)
//!      …  rest      ciphertext (payload || 16 B GCM tag)
//! ```
//!
//! Everything before the ciphertext is authenticated as AEAD associated data.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};
use thiserror::Error;

use crate::crypto::{NONCE_LEN, SALT_LEN};

/// Byte offset of the `meta_len` field.
pub const META_LEN_OFFSET: usize = SALT_LEN + NONCE_LEN;
/// Size of the fixed header (salt + nonce + meta_len).
pub const HEADER_LEN: usize = META_LEN_OFFSET + 4;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Envelope too short: {len} bytes, header needs {HEADER_LEN}")]
    TooShort { len: usize },
    #[error("Metadata length {meta_len} exceeds the {available} bytes after the header")]
    MetadataOutOfRange { meta_len: u32, available: usize },
    #[error("Metadata block too large: {0} bytes")]
    MetadataTooLarge(usize),
    #[error("Metadata block is unreadable: {0}")]
    InvalidMetadata(String),
}

/// A parsed (or about to be written) envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub salt:       [u8; SALT_LEN],
    pub nonce:      [u8; NONCE_LEN],
    pub metadata:   Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Total encoded length.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.metadata.len() + self.ciphertext.len()
    }

    /// Header + metadata bytes, the region authenticated by the cipher.
    pub fn associated_data(&self) -> Result<Vec<u8>, EnvelopeError> {
        Self::header_bytes(&self.salt, &self.nonce, &self.metadata)
    }

    /// Serialize salt, nonce, meta_len and metadata; the ciphertext is
    /// appended separately so this can be fed to the cipher before sealing.
    pub fn header_bytes(
        salt:     &[u8; SALT_LEN],
        nonce:    &[u8; NONCE_LEN],
        metadata: &[u8],
    ) -> Result<Vec<u8>, EnvelopeError> {
        let mut out = Vec::with_capacity(HEADER_LEN + metadata.len());
        write_header(&mut out, salt, nonce, metadata).map_err(|e| into_envelope_error(e, metadata))?;
        Ok(out)
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        write_header(&mut writer, &self.salt, &self.nonce, &self.metadata)?;
        writer.write_all(&self.ciphertext)
    }

    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write(&mut out).map_err(|e| into_envelope_error(e, &self.metadata))?;
        Ok(out)
    }

    /// Parse `bytes` into its fields.  Only the structure is checked here;
    /// integrity is verified by the cipher.
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        if bytes.len() < HEADER_LEN {
            return Err(EnvelopeError::TooShort { len: bytes.len() });
        }
        let mut reader = Cursor::new(bytes);
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        let meta_len = read_header(&mut reader, &mut salt, &mut nonce)
            .map_err(|_| EnvelopeError::TooShort { len: bytes.len() })?;

        let available = bytes.len() - HEADER_LEN;
        if meta_len as usize > available {
            return Err(EnvelopeError::MetadataOutOfRange { meta_len, available });
        }
        let meta_end = HEADER_LEN + meta_len as usize;
        Ok(Self {
            salt,
            nonce,
            metadata:   bytes[HEADER_LEN..meta_end].to_vec(),
            ciphertext: bytes[meta_end..].to_vec(),
        })
    }
}

// The single encoder for everything before the ciphertext.
fn write_header<W: Write>(
    mut writer: W,
    salt:       &[u8; SALT_LEN],
    nonce:      &[u8; NONCE_LEN],
    metadata:   &[u8],
) -> io::Result<()> {
    let meta_len = u32::try_from(metadata.len()).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, EnvelopeError::MetadataTooLarge(metadata.len()))
    })?;
    writer.write_all(salt)?;
    writer.write_all(nonce)?;
    writer.write_u32::<LittleEndian>(meta_len)?;
    writer.write_all(metadata)
}

// Writes into a Vec only fail on an oversized metadata block.
fn into_envelope_error(_: io::Error, metadata: &[u8]) -> EnvelopeError {
    EnvelopeError::MetadataTooLarge(metadata.len())
}

fn read_header<R: Read>(
    mut reader: R,
    salt:       &mut [u8; SALT_LEN],
    nonce:      &mut [u8; NONCE_LEN],
) -> io::Result<u32> {
    reader.read_exact(salt)?;
    reader.read_exact(nonce)?;
    reader.read_u32::<LittleEndian>()
}
