//! Binary envelope format: header layout, serialization, and parsing.
//!
//! Wire layout (version 1):
//!
//! ```text
//! offset  size  field
//!   0      2    magic "EC"
//!   2      1    version (0x01)
//!   3      1    algorithm (0x01 = AES-256-GCM)
//!   4      1    key ID length (0..=255)
//!   5      L    key ID (UTF-8)
//!   5+L   12    DEK nonce
//!  17+L   48    wrapped DEK (32B key || 16B GCM tag)
//!  65+L   12    data nonce
//!  77+L    *    ciphertext || 16B GCM tag
//! ```

use std::io::Write;

use crate::error::{EnvelopeError, Result};

/// Two-byte file signature "EC" (Encrypted Config).
pub(crate) const MAGIC: [u8; 2] = *b"EC";

/// Current binary format version.
pub(crate) const FORMAT_VERSION: u8 = 0x01;

/// Identifies AES-256-GCM as the encryption algorithm.
pub(crate) const ALG_AES_256_GCM: u8 = 0x01;

/// Required key size in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// Nonce size for AES-GCM in bytes.
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size for GCM in bytes.
pub const TAG_SIZE: usize = 16;

/// Size of a wrapped DEK: 32-byte key plus 16-byte GCM tag.
pub const WRAPPED_DEK_SIZE: usize = KEY_SIZE + TAG_SIZE;

/// Minimum header size: magic(2) + version(1) + algorithm(1) + keyIDLen(1).
pub(crate) const MIN_HEADER_SIZE: usize = 5;

/// Parsed header of an encrypted envelope.
///
/// The three fixed-width byte fields are owned arrays, so a parsed header is
/// independent of the buffer it was read from.
#[derive(Debug)]
pub(crate) struct Header {
    pub version: u8,
    pub algorithm: u8,
    pub key_id: String,
    pub dek_nonce: [u8; NONCE_SIZE],
    pub wrapped_dek: [u8; WRAPPED_DEK_SIZE],
    pub data_nonce: [u8; NONCE_SIZE],
}

/// Returns the total header size in bytes for a key ID of the given UTF-8
/// byte length.
pub(crate) fn header_size(key_id_len: usize) -> usize {
    MIN_HEADER_SIZE + key_id_len + NONCE_SIZE + WRAPPED_DEK_SIZE + NONCE_SIZE
}

/// Writes the binary header to `w`.
///
/// Fails with `InvalidFormat` if the key ID exceeds 255 bytes of UTF-8.
/// I/O errors from the sink propagate unchanged.
pub(crate) fn write_header<W: Write>(w: &mut W, h: &Header) -> Result<()> {
    let key_id = h.key_id.as_bytes();
    if key_id.len() > 255 {
        return Err(EnvelopeError::InvalidFormat("key ID too long".into()));
    }

    w.write_all(&MAGIC)?;
    w.write_all(&[h.version, h.algorithm, key_id.len() as u8])?;
    w.write_all(key_id)?;
    w.write_all(&h.dek_nonce)?;
    w.write_all(&h.wrapped_dek)?;
    w.write_all(&h.data_nonce)?;

    Ok(())
}

/// Parses the binary header from `data`, returning the header and the
/// remaining bytes (the ciphertext).
///
/// The returned header owns copies of its byte fields; only the remainder
/// borrows from the input.
pub(crate) fn read_header(data: &[u8]) -> Result<(Header, &[u8])> {
    if data.len() < MIN_HEADER_SIZE {
        return Err(EnvelopeError::InvalidFormat("data too short".into()));
    }

    if data[0..2] != MAGIC {
        return Err(EnvelopeError::InvalidFormat("invalid magic bytes".into()));
    }

    let version = data[2];
    if version != FORMAT_VERSION {
        return Err(EnvelopeError::InvalidFormat(format!(
            "unsupported version {version}"
        )));
    }

    let algorithm = data[3];
    if algorithm != ALG_AES_256_GCM {
        return Err(EnvelopeError::InvalidFormat(format!(
            "unsupported algorithm {algorithm}"
        )));
    }

    let key_id_len = data[4] as usize;
    let needed = key_id_len + NONCE_SIZE + WRAPPED_DEK_SIZE + NONCE_SIZE;
    if data.len() < MIN_HEADER_SIZE + needed {
        return Err(EnvelopeError::InvalidFormat(
            "data too short for header".into(),
        ));
    }

    let mut offset = MIN_HEADER_SIZE;

    let key_id = std::str::from_utf8(&data[offset..offset + key_id_len])
        .map_err(|_| EnvelopeError::InvalidFormat("key ID is not valid UTF-8".into()))?
        .to_owned();
    offset += key_id_len;

    let mut dek_nonce = [0u8; NONCE_SIZE];
    dek_nonce.copy_from_slice(&data[offset..offset + NONCE_SIZE]);
    offset += NONCE_SIZE;

    let mut wrapped_dek = [0u8; WRAPPED_DEK_SIZE];
    wrapped_dek.copy_from_slice(&data[offset..offset + WRAPPED_DEK_SIZE]);
    offset += WRAPPED_DEK_SIZE;

    let mut data_nonce = [0u8; NONCE_SIZE];
    data_nonce.copy_from_slice(&data[offset..offset + NONCE_SIZE]);
    offset += NONCE_SIZE;

    let header = Header {
        version,
        algorithm,
        key_id,
        dek_nonce,
        wrapped_dek,
        data_nonce,
    };

    Ok((header, &data[offset..]))
}
