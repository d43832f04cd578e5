//! Key provider backed by AWS KMS.
//!
//! Encrypted key material (the output of KMS `Encrypt` or `GenerateDataKey`)
//! is decrypted via the KMS `Decrypt` operation at construction time and
//! cached in a [`StaticKeyProvider`]. With the `aws-sdk` feature enabled,
//! [`DecryptClient`] is implemented for `aws_sdk_kms::Client` directly;
//! otherwise any client wrapper can implement the trait.

use async_trait::async_trait;
use tracing::debug;
use zeroize::Zeroizing;

use super::ClientError;
use crate::error::{EnvelopeError, Result};
use crate::provider::StaticKeyProvider;

/// The subset of the AWS KMS API used by this adapter.
#[async_trait]
pub trait DecryptClient: Send + Sync {
    /// Decrypts a ciphertext blob, returning the plaintext.
    ///
    /// `kms_key_id` is the KMS key ARN or alias the ciphertext was encrypted
    /// under; `None` lets KMS determine the key from the ciphertext
    /// metadata.
    async fn decrypt(
        &self,
        ciphertext: &[u8],
        kms_key_id: Option<&str>,
    ) -> std::result::Result<Vec<u8>, ClientError>;
}

struct EncryptedKeyEntry {
    ciphertext: Vec<u8>,
    id: String,
    kms_key_id: Option<String>,
}

/// Builds a [`StaticKeyProvider`] from keys unwrapped via AWS KMS.
///
/// The first key added becomes the current key for new encryptions;
/// subsequent keys are rotation-era keys available for decryption only.
#[derive(Default)]
pub struct AwsKmsProvider {
    entries: Vec<EncryptedKeyEntry>,
}

impl AwsKmsProvider {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds an encrypted key to be unwrapped via KMS `Decrypt`.
    ///
    /// `id` identifies the key in envelope headers.
    pub fn with_encrypted_key(mut self, ciphertext: &[u8], id: impl Into<String>) -> Self {
        self.entries.push(EncryptedKeyEntry {
            ciphertext: ciphertext.to_vec(),
            id: id.into(),
            kms_key_id: None,
        });
        self
    }

    /// Like [`with_encrypted_key`](Self::with_encrypted_key), but names the
    /// KMS key ARN or alias to decrypt with. Use this when the ciphertext
    /// was encrypted under a specific KMS key.
    pub fn with_encrypted_key_for_kms_key(
        mut self,
        ciphertext: &[u8],
        id: impl Into<String>,
        kms_key_id: impl Into<String>,
    ) -> Self {
        self.entries.push(EncryptedKeyEntry {
            ciphertext: ciphertext.to_vec(),
            id: id.into(),
            kms_key_id: Some(kms_key_id.into()),
        });
        self
    }

    /// Decrypts all registered keys through `client` and builds the
    /// provider.
    ///
    /// Fails with [`EnvelopeError::Config`] if no keys were added. Client
    /// failures surface as [`EnvelopeError::Kms`]. The plaintext buffers
    /// returned by KMS are zeroized once copied into the provider.
    pub async fn build<C: DecryptClient>(self, client: &C) -> Result<StaticKeyProvider> {
        if self.entries.is_empty() {
            return Err(EnvelopeError::Config(
                "at least one encrypted key is required".into(),
            ));
        }

        let mut keys: Vec<(Zeroizing<Vec<u8>>, String)> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let plaintext = client
                .decrypt(&entry.ciphertext, entry.kms_key_id.as_deref())
                .await
                .map_err(|e| {
                    EnvelopeError::Kms(format!("failed to decrypt key {:?}: {e}", entry.id))
                })?;
            keys.push((Zeroizing::new(plaintext), entry.id.clone()));
        }

        debug!(count = keys.len(), current = %keys[0].1, "unwrapped keys via AWS KMS");

        let mut builder = StaticKeyProvider::builder(&keys[0].0, keys[0].1.as_str());
        for (bytes, id) in &keys[1..] {
            builder = builder.with_old_key(bytes, id.as_str());
        }
        builder.build()
    }
}

#[cfg(feature = "aws-sdk")]
#[async_trait]
impl DecryptClient for aws_sdk_kms::Client {
    async fn decrypt(
        &self,
        ciphertext: &[u8],
        kms_key_id: Option<&str>,
    ) -> std::result::Result<Vec<u8>, ClientError> {
        let mut req = self
            .decrypt()
            .ciphertext_blob(aws_sdk_kms::primitives::Blob::new(ciphertext.to_vec()));
        if let Some(key_id) = kms_key_id {
            req = req.key_id(key_id);
        }

        let resp = req.send().await.map_err(|e| Box::new(e) as ClientError)?;
        let plaintext = resp
            .plaintext()
            .ok_or("KMS decrypt response contained no plaintext")?;
        Ok(plaintext.as_ref().to_vec())
    }
}
