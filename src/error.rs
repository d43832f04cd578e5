//! Error types for the envelope codec.

use thiserror::Error;

/// Result type alias for envelope codec operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;

/// Errors that can occur during envelope encryption, decryption, and key
/// provider operations.
///
/// Callers are expected to match on the variant, not on the message text.
/// The variants are part of the public contract.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    /// A key was presented whose raw-byte length is not 32 (AES-256).
    #[error("invalid key size: expected 32 bytes, got {0}")]
    InvalidKeySize(usize),

    /// A key ID was empty.
    #[error("invalid key ID: {0}")]
    InvalidKeyId(String),

    /// The envelope could not be parsed: too short, bad magic, unsupported
    /// version or algorithm, truncated body, or a key ID over 255 bytes on
    /// write.
    #[error("invalid envelope format: {0}")]
    InvalidFormat(String),

    /// The provider has no key with the requested ID.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// An AEAD authentication check failed, on either the wrapped-DEK layer
    /// or the data layer. The message says which.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// An operation was attempted on a key provider after `destroy()`.
    #[error("key provider destroyed")]
    ProviderDestroyed,

    /// The wrapped serializer failed to encode a value.
    #[error("inner encode failed: {0}")]
    InnerEncode(String),

    /// The wrapped serializer failed to decode a payload.
    #[error("inner decode failed: {0}")]
    InnerDecode(String),

    /// Invalid construction-time configuration (e.g. a KMS provider built
    /// with no keys).
    #[error("configuration error: {0}")]
    Config(String),

    /// A KMS client call failed while unwrapping key material.
    #[error("kms error: {0}")]
    Kms(String),

    /// RNG failure or an unexpected failure from the AEAD library.
    #[error("internal error: {0}")]
    Internal(String),

    /// An I/O error from the sink passed to header serialization.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
