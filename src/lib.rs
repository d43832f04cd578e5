//! # envelope-codec
//!
//! An authenticated envelope-encryption codec for configuration values.
//!
//! ## Overview
//!
//! Every encoded payload is encrypted under a freshly generated single-use
//! **Data Encryption Key (DEK)**, and the DEK is itself encrypted under a
//! long-lived **Key Encryption Key (KEK)** held by a pluggable
//! [`KeyProvider`]. The output is a self-describing binary envelope that
//! names the KEK by a short string ID, so KEKs can be rotated without
//! re-encrypting existing payloads. The key ID is bound into both
//! encryption layers as additional authenticated data, which turns key-ID
//! substitution into a detectable tampering attack.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use envelope_codec::{Codec, EncryptedCodec, JsonCodec, StaticKeyProvider};
//!
//! # fn main() -> envelope_codec::Result<()> {
//! let key = [7u8; 32];
//! let provider = StaticKeyProvider::new(&key, "key-2024-01")?;
//!
//! // Wrap the JSON codec with encryption.
//! let codec = EncryptedCodec::new(JsonCodec, Arc::new(provider));
//! assert_eq!(codec.name(), "encrypted:json");
//!
//! let data = codec.encode("my-db-password")?;
//! let secret: String = codec.decode(&data)?;
//! assert_eq!(secret, "my-db-password");
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Rotation
//!
//! ```
//! use std::sync::Arc;
//! use envelope_codec::{Codec, EncryptedCodec, JsonCodec, StaticKeyProvider};
//!
//! # fn main() -> envelope_codec::Result<()> {
//! let old_key = [1u8; 32];
//! let new_key = [2u8; 32];
//!
//! // Payload encrypted while key-v1 was current.
//! let old_provider = StaticKeyProvider::new(&old_key, "key-v1")?;
//! let old_codec = EncryptedCodec::new(JsonCodec, Arc::new(old_provider));
//! let data = old_codec.encode("secret")?;
//!
//! // After rotation the old key stays available for decryption.
//! let provider = StaticKeyProvider::builder(&new_key, "key-v2")
//!     .with_old_key(&old_key, "key-v1")
//!     .build()?;
//! let codec = EncryptedCodec::new(JsonCodec, Arc::new(provider));
//!
//! let secret: String = codec.decode(&data)?;
//! assert_eq!(secret, "secret");
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Features
//!
//! - **AES-256-GCM** authenticated encryption at both envelope layers
//! - **Key rotation** via rotation-era keys looked up by ID
//! - **KMS adapters** for AWS KMS, Azure Key Vault, Google Cloud KMS, and
//!   Vault Transit ([`kms`])
//! - **Zeroization**: DEKs, provider key stores, and KMS plaintext buffers
//!   are wiped from memory when no longer needed
//! - **Concurrency-safe**: codecs and providers are usable from any number
//!   of threads
//!
//! ## Modules
//!
//! - [`codec`] - the [`Codec`] trait, [`JsonCodec`], and [`EncryptedCodec`]
//! - [`crypto`] - the [`encrypt`]/[`decrypt`] envelope primitives
//! - [`provider`] - [`Key`], [`KeyProvider`], and [`StaticKeyProvider`]
//! - [`kms`] - KMS-backed provider construction
//! - [`error`] - [`EnvelopeError`] and the crate [`Result`] alias

pub mod codec;
pub mod crypto;
pub mod error;
pub mod format;
pub mod kms;
pub mod provider;

// ============================================================================
// Codec Exports
// ============================================================================

/// Serialization contract for inner codecs and the encrypting wrapper.
pub use codec::Codec;

/// Codec wrapper that chains an inner serializer with envelope encryption.
pub use codec::EncryptedCodec;

/// JSON codec backed by `serde_json`.
pub use codec::JsonCodec;

// ============================================================================
// Crypto Exports
// ============================================================================

/// Encrypts a payload into a self-describing envelope.
pub use crypto::encrypt;

/// Decrypts an envelope, resolving the KEK through a key provider.
pub use crypto::decrypt;

/// AES-256 key size in bytes (32).
pub use format::KEY_SIZE;

/// AES-GCM nonce size in bytes (12).
pub use format::NONCE_SIZE;

/// AES-GCM authentication tag size in bytes (16).
pub use format::TAG_SIZE;

// ============================================================================
// Provider Exports
// ============================================================================

/// A named encryption key with zeroize-on-drop key material.
pub use provider::Key;

/// Key retrieval contract for encryption and decryption.
pub use provider::KeyProvider;

/// In-memory, concurrency-safe key provider with rotation support.
pub use provider::StaticKeyProvider;

/// Builder for [`StaticKeyProvider`] with rotation-era keys.
pub use provider::StaticKeyProviderBuilder;

// ============================================================================
// Error Exports
// ============================================================================

/// Error type for all envelope codec operations.
pub use error::EnvelopeError;

/// Result type alias using [`EnvelopeError`].
pub use error::Result;
