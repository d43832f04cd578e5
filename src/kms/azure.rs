//! Key provider backed by Azure Key Vault.
//!
//! Wrapped key material (the output of the Key Vault `WrapKey` operation)
//! is unwrapped via `UnwrapKey` at construction time and cached in a
//! [`StaticKeyProvider`]. The adapter is written against the abstract
//! [`UnwrapKeyClient`] trait so any Key Vault client library can be plugged
//! in.

use async_trait::async_trait;
use tracing::debug;
use zeroize::Zeroizing;

use super::ClientError;
use crate::error::{EnvelopeError, Result};
use crate::provider::StaticKeyProvider;

/// Default unwrap algorithm.
pub const DEFAULT_ALGORITHM: &str = "RSA-OAEP-256";

/// The subset of the Azure Key Vault API used by this adapter.
#[async_trait]
pub trait UnwrapKeyClient: Send + Sync {
    /// Unwraps `ciphertext` using the Key Vault key identified by
    /// `key_name` and `key_version`, returning the plaintext.
    async fn unwrap_key(
        &self,
        key_name: &str,
        key_version: &str,
        algorithm: &str,
        ciphertext: &[u8],
    ) -> std::result::Result<Vec<u8>, ClientError>;
}

struct WrappedKeyEntry {
    ciphertext: Vec<u8>,
    id: String,
    key_name: String,
    key_version: String,
    algorithm: String,
}

/// Builds a [`StaticKeyProvider`] from keys unwrapped via Azure Key Vault.
///
/// The first key added becomes the current key for new encryptions;
/// subsequent keys are rotation-era keys available for decryption only.
#[derive(Default)]
pub struct AzureKeyVaultProvider {
    entries: Vec<WrappedKeyEntry>,
}

impl AzureKeyVaultProvider {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds a wrapped key to be unwrapped via Key Vault, using
    /// [`DEFAULT_ALGORITHM`].
    ///
    /// `key_name` and `key_version` identify the Key Vault key used for
    /// wrapping; `id` identifies the key in envelope headers.
    pub fn with_wrapped_key(
        self,
        ciphertext: &[u8],
        id: impl Into<String>,
        key_name: impl Into<String>,
        key_version: impl Into<String>,
    ) -> Self {
        self.with_wrapped_key_algorithm(ciphertext, id, key_name, key_version, DEFAULT_ALGORITHM)
    }

    /// Like [`with_wrapped_key`](Self::with_wrapped_key), but with an
    /// explicit unwrap algorithm.
    pub fn with_wrapped_key_algorithm(
        mut self,
        ciphertext: &[u8],
        id: impl Into<String>,
        key_name: impl Into<String>,
        key_version: impl Into<String>,
        algorithm: impl Into<String>,
    ) -> Self {
        self.entries.push(WrappedKeyEntry {
            ciphertext: ciphertext.to_vec(),
            id: id.into(),
            key_name: key_name.into(),
            key_version: key_version.into(),
            algorithm: algorithm.into(),
        });
        self
    }

    /// Unwraps all registered keys through `client` and builds the
    /// provider.
    ///
    /// Fails with [`EnvelopeError::Config`] if no keys were added. Client
    /// failures surface as [`EnvelopeError::Kms`]. The plaintext buffers
    /// returned by Key Vault are zeroized once copied into the provider.
    pub async fn build<C: UnwrapKeyClient>(self, client: &C) -> Result<StaticKeyProvider> {
        if self.entries.is_empty() {
            return Err(EnvelopeError::Config(
                "at least one wrapped key is required".into(),
            ));
        }

        let mut keys: Vec<(Zeroizing<Vec<u8>>, String)> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let plaintext = client
                .unwrap_key(
                    &entry.key_name,
                    &entry.key_version,
                    &entry.algorithm,
                    &entry.ciphertext,
                )
                .await
                .map_err(|e| {
                    EnvelopeError::Kms(format!("failed to unwrap key {:?}: {e}", entry.id))
                })?;
            keys.push((Zeroizing::new(plaintext), entry.id.clone()));
        }

        debug!(count = keys.len(), current = %keys[0].1, "unwrapped keys via Azure Key Vault");

        let mut builder = StaticKeyProvider::builder(&keys[0].0, keys[0].1.as_str());
        for (bytes, id) in &keys[1..] {
            builder = builder.with_old_key(bytes, id.as_str());
        }
        builder.build()
    }
}
