//! Key provider backed by the HashiCorp Vault Transit secrets engine.
//!
//! Key material encrypted via the Transit encrypt endpoint is decrypted at
//! construction time and cached in a [`StaticKeyProvider`]. Transit
//! ciphertexts are strings in Vault's own format (`vault:v1:<base64>`), so
//! the client trait takes and returns strings on the wire side.

use async_trait::async_trait;
use tracing::debug;
use zeroize::Zeroizing;

use super::ClientError;
use crate::error::{EnvelopeError, Result};
use crate::provider::StaticKeyProvider;

/// Abstracts the Vault Transit decrypt operation.
#[async_trait]
pub trait TransitClient: Send + Sync {
    /// Decrypts `ciphertext` (in Vault's `vault:v1:...` format) using the
    /// named Transit key, returning the plaintext bytes.
    async fn transit_decrypt(
        &self,
        key_name: &str,
        ciphertext: &str,
    ) -> std::result::Result<Vec<u8>, ClientError>;
}

struct EncryptedKeyEntry {
    ciphertext: String,
    id: String,
    transit_key_name: String,
}

/// Builds a [`StaticKeyProvider`] from keys decrypted via Vault Transit.
///
/// The first key added becomes the current key for new encryptions;
/// subsequent keys are rotation-era keys available for decryption only.
#[derive(Default)]
pub struct VaultTransitProvider {
    entries: Vec<EncryptedKeyEntry>,
}

impl VaultTransitProvider {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds a Transit-encrypted key to be decrypted at construction time.
    ///
    /// `transit_key_name` names the Transit key in Vault; `id` identifies
    /// the key in envelope headers.
    pub fn with_encrypted_key(
        mut self,
        ciphertext: impl Into<String>,
        id: impl Into<String>,
        transit_key_name: impl Into<String>,
    ) -> Self {
        self.entries.push(EncryptedKeyEntry {
            ciphertext: ciphertext.into(),
            id: id.into(),
            transit_key_name: transit_key_name.into(),
        });
        self
    }

    /// Decrypts all registered keys through `client` and builds the
    /// provider.
    ///
    /// Fails with [`EnvelopeError::Config`] if no keys were added. Client
    /// failures surface as [`EnvelopeError::Kms`]. The plaintext buffers
    /// returned by Vault are zeroized once copied into the provider.
    pub async fn build<C: TransitClient>(self, client: &C) -> Result<StaticKeyProvider> {
        if self.entries.is_empty() {
            return Err(EnvelopeError::Config(
                "at least one encrypted key is required".into(),
            ));
        }

        let mut keys: Vec<(Zeroizing<Vec<u8>>, String)> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let plaintext = client
                .transit_decrypt(&entry.transit_key_name, &entry.ciphertext)
                .await
                .map_err(|e| {
                    EnvelopeError::Kms(format!("failed to decrypt key {:?}: {e}", entry.id))
                })?;
            keys.push((Zeroizing::new(plaintext), entry.id.clone()));
        }

        debug!(count = keys.len(), current = %keys[0].1, "decrypted keys via Vault Transit");

        let mut builder = StaticKeyProvider::builder(&keys[0].0, keys[0].1.as_str());
        for (bytes, id) in &keys[1..] {
            builder = builder.with_old_key(bytes, id.as_str());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::KeyProvider;
    use base64::{engine::general_purpose::STANDARD, Engine};

    fn make_key(offset: u8) -> Vec<u8> {
        (0u8..32).map(|i| i.wrapping_add(offset)).collect()
    }

    fn transit_wrap(plaintext: &[u8]) -> String {
        format!("vault:v1:{}", STANDARD.encode(plaintext))
    }

    /// Mock client that understands the `vault:v1:<base64>` format.
    struct MockTransit {
        key_name: String,
    }

    #[async_trait]
    impl TransitClient for MockTransit {
        async fn transit_decrypt(
            &self,
            key_name: &str,
            ciphertext: &str,
        ) -> std::result::Result<Vec<u8>, ClientError> {
            if key_name != self.key_name {
                return Err("unknown transit key".into());
            }
            let encoded = ciphertext
                .strip_prefix("vault:v1:")
                .ok_or("unexpected ciphertext format")?;
            Ok(STANDARD.decode(encoded)?)
        }
    }

    #[tokio::test]
    async fn test_no_keys_is_config_error() {
        let client = MockTransit {
            key_name: "transit-kek".into(),
        };
        let err = VaultTransitProvider::new().build(&client).await.unwrap_err();
        assert!(matches!(err, EnvelopeError::Config(_)));
    }

    #[tokio::test]
    async fn test_unwrap_and_rotation_order() {
        let client = MockTransit {
            key_name: "transit-kek".into(),
        };

        let provider = VaultTransitProvider::new()
            .with_encrypted_key(transit_wrap(&make_key(50)), "key-v2", "transit-kek")
            .with_encrypted_key(transit_wrap(&make_key(0)), "key-v1", "transit-kek")
            .build(&client)
            .await
            .unwrap();

        assert_eq!(provider.current_key().unwrap().id(), "key-v2");
        assert_eq!(
            provider.key_by_id("key-v1").unwrap().bytes(),
            make_key(0).as_slice()
        );
    }

    #[tokio::test]
    async fn test_wrong_transit_key_propagates() {
        let client = MockTransit {
            key_name: "transit-kek".into(),
        };

        let err = VaultTransitProvider::new()
            .with_encrypted_key(transit_wrap(&make_key(0)), "key-1", "other-key")
            .build(&client)
            .await
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Kms(_)));
    }

    #[tokio::test]
    async fn test_malformed_ciphertext_propagates() {
        let client = MockTransit {
            key_name: "transit-kek".into(),
        };

        let err = VaultTransitProvider::new()
            .with_encrypted_key("not-a-vault-ciphertext", "key-1", "transit-kek")
            .build(&client)
            .await
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Kms(_)));
    }
}
