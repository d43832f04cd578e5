//! Envelope encryption primitives.
//!
//! Each [`encrypt`] call draws a fresh single-use data-encryption key (DEK),
//! wraps it under the caller's key-encryption key (KEK) with AES-256-GCM,
//! encrypts the payload under the DEK, and assembles the self-describing
//! envelope. [`decrypt`] reverses this, resolving the KEK through a
//! [`KeyProvider`] using the key ID carried in the envelope header.
//!
//! The key ID is bound as additional authenticated data at both layers, so
//! substituting the header's key ID breaks authentication instead of
//! silently redirecting decryption to another key.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{EnvelopeError, Result};
use crate::format::{
    self, header_size, Header, ALG_AES_256_GCM, FORMAT_VERSION, KEY_SIZE, NONCE_SIZE, TAG_SIZE,
    WRAPPED_DEK_SIZE,
};
use crate::provider::{Key, KeyProvider};

/// Encrypts `plaintext` under a fresh DEK, wrapping the DEK with `kek`.
///
/// The output is a self-contained envelope: header (carrying the KEK's ID,
/// both nonces, and the wrapped DEK) followed by the payload ciphertext.
/// Total size is `93 + kek.id().len() + plaintext.len()` bytes.
///
/// The DEK is overwritten with zero on every exit path.
pub fn encrypt(plaintext: &[u8], kek: &Key) -> Result<Vec<u8>> {
    if kek.bytes().len() != KEY_SIZE {
        return Err(EnvelopeError::InvalidKeySize(kek.bytes().len()));
    }

    // Fresh single-use DEK. The Zeroizing wrapper guarantees the buffer is
    // wiped when this function returns, on success or failure.
    let mut dek = Zeroizing::new([0u8; KEY_SIZE]);
    OsRng
        .try_fill_bytes(dek.as_mut_slice())
        .map_err(|e| EnvelopeError::Internal(format!("failed to generate DEK: {e}")))?;

    let mut dek_nonce = [0u8; NONCE_SIZE];
    OsRng
        .try_fill_bytes(&mut dek_nonce)
        .map_err(|e| EnvelopeError::Internal(format!("failed to generate DEK nonce: {e}")))?;

    // Wrap the DEK under the KEK, binding the key ID as AAD.
    let kek_cipher = Aes256Gcm::new_from_slice(kek.bytes())
        .map_err(|e| EnvelopeError::Internal(format!("failed to create KEK cipher: {e}")))?;
    let wrapped = kek_cipher
        .encrypt(
            Nonce::from_slice(&dek_nonce),
            Payload {
                msg: dek.as_slice(),
                aad: kek.id().as_bytes(),
            },
        )
        .map_err(|_| EnvelopeError::Internal("failed to wrap DEK".into()))?;
    let wrapped_dek: [u8; WRAPPED_DEK_SIZE] = wrapped
        .try_into()
        .map_err(|_| EnvelopeError::Internal("unexpected wrapped DEK length".into()))?;

    let mut data_nonce = [0u8; NONCE_SIZE];
    OsRng
        .try_fill_bytes(&mut data_nonce)
        .map_err(|e| EnvelopeError::Internal(format!("failed to generate data nonce: {e}")))?;

    let data_cipher = Aes256Gcm::new_from_slice(dek.as_slice())
        .map_err(|e| EnvelopeError::Internal(format!("failed to create DEK cipher: {e}")))?;
    let ciphertext = data_cipher
        .encrypt(
            Nonce::from_slice(&data_nonce),
            Payload {
                msg: plaintext,
                aad: kek.id().as_bytes(),
            },
        )
        .map_err(|_| EnvelopeError::Internal("failed to encrypt payload".into()))?;

    let header = Header {
        version: FORMAT_VERSION,
        algorithm: ALG_AES_256_GCM,
        key_id: kek.id().to_owned(),
        dek_nonce,
        wrapped_dek,
        data_nonce,
    };

    let mut out = Vec::with_capacity(header_size(kek.id().len()) + ciphertext.len());
    format::write_header(&mut out, &header)?;
    out.extend_from_slice(&ciphertext);

    Ok(out)
}

/// Decrypts an envelope produced by [`encrypt`].
///
/// The KEK is looked up in `provider` by the key ID carried in the header,
/// so envelopes remain decryptable across key rotations as long as the
/// provider retains the old key. The unwrapped DEK is overwritten with zero
/// before returning.
pub fn decrypt<P: KeyProvider + ?Sized>(data: &[u8], provider: &P) -> Result<Vec<u8>> {
    let (header, ciphertext) = format::read_header(data)?;

    let kek = provider.key_by_id(&header.key_id)?;
    if kek.bytes().len() != KEY_SIZE {
        return Err(EnvelopeError::InvalidKeySize(kek.bytes().len()));
    }

    // Unwrap the DEK, verifying the key ID binding.
    let kek_cipher = Aes256Gcm::new_from_slice(kek.bytes())
        .map_err(|e| EnvelopeError::Internal(format!("failed to create KEK cipher: {e}")))?;
    let dek = Zeroizing::new(
        kek_cipher
            .decrypt(
                Nonce::from_slice(&header.dek_nonce),
                Payload {
                    msg: &header.wrapped_dek[..],
                    aad: header.key_id.as_bytes(),
                },
            )
            .map_err(|_| EnvelopeError::DecryptionFailed("failed to decrypt DEK".into()))?,
    );

    // AEAD libraries reject this too, but checking here keeps the error in
    // the format category rather than the authentication one.
    if ciphertext.len() < TAG_SIZE {
        return Err(EnvelopeError::InvalidFormat(
            "ciphertext shorter than the GCM tag".into(),
        ));
    }

    let data_cipher = Aes256Gcm::new_from_slice(&dek)
        .map_err(|e| EnvelopeError::Internal(format!("failed to create DEK cipher: {e}")))?;
    data_cipher
        .decrypt(
            Nonce::from_slice(&header.data_nonce),
            Payload {
                msg: ciphertext,
                aad: header.key_id.as_bytes(),
            },
        )
        .map_err(|_| EnvelopeError::DecryptionFailed("failed to decrypt data".into()))
}
