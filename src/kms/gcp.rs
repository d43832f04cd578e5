//! Key provider backed by Google Cloud KMS.
//!
//! Encrypted key material is unwrapped via the CryptoKeys `Decrypt` RPC at
//! construction time and cached in a [`StaticKeyProvider`]. Each key names
//! the full CryptoKey resource
//! (`projects/*/locations/*/keyRings/*/cryptoKeys/*`) it was encrypted
//! under.

use async_trait::async_trait;
use tracing::debug;
use zeroize::Zeroizing;

use super::ClientError;
use crate::error::{EnvelopeError, Result};
use crate::provider::StaticKeyProvider;

/// The subset of the Cloud KMS API used by this adapter.
#[async_trait]
pub trait DecryptClient: Send + Sync {
    /// Decrypts `ciphertext` with the CryptoKey named by `resource_name`,
    /// returning the plaintext.
    async fn decrypt(
        &self,
        resource_name: &str,
        ciphertext: &[u8],
    ) -> std::result::Result<Vec<u8>, ClientError>;
}

struct EncryptedKeyEntry {
    ciphertext: Vec<u8>,
    id: String,
    resource_name: String,
}

/// Builds a [`StaticKeyProvider`] from keys unwrapped via Cloud KMS.
///
/// The first key added becomes the current key for new encryptions;
/// subsequent keys are rotation-era keys available for decryption only.
#[derive(Default)]
pub struct GcpKmsProvider {
    entries: Vec<EncryptedKeyEntry>,
}

impl GcpKmsProvider {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds an encrypted key to be unwrapped via the `Decrypt` RPC.
    ///
    /// `resource_name` is the full CryptoKey resource name; `id` identifies
    /// the key in envelope headers.
    pub fn with_encrypted_key(
        mut self,
        ciphertext: &[u8],
        id: impl Into<String>,
        resource_name: impl Into<String>,
    ) -> Self {
        self.entries.push(EncryptedKeyEntry {
            ciphertext: ciphertext.to_vec(),
            id: id.into(),
            resource_name: resource_name.into(),
        });
        self
    }

    /// Decrypts all registered keys through `client` and builds the
    /// provider.
    ///
    /// Fails with [`EnvelopeError::Config`] if no keys were added. Client
    /// failures surface as [`EnvelopeError::Kms`]. The plaintext buffers
    /// returned by Cloud KMS are zeroized once copied into the provider.
    pub async fn build<C: DecryptClient>(self, client: &C) -> Result<StaticKeyProvider> {
        if self.entries.is_empty() {
            return Err(EnvelopeError::Config(
                "at least one encrypted key is required".into(),
            ));
        }

        let mut keys: Vec<(Zeroizing<Vec<u8>>, String)> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let plaintext = client
                .decrypt(&entry.resource_name, &entry.ciphertext)
                .await
                .map_err(|e| {
                    EnvelopeError::Kms(format!("failed to decrypt key {:?}: {e}", entry.id))
                })?;
            keys.push((Zeroizing::new(plaintext), entry.id.clone()));
        }

        debug!(count = keys.len(), current = %keys[0].1, "unwrapped keys via Cloud KMS");

        let mut builder = StaticKeyProvider::builder(&keys[0].0, keys[0].1.as_str());
        for (bytes, id) in &keys[1..] {
            builder = builder.with_old_key(bytes, id.as_str());
        }
        builder.build()
    }
}
