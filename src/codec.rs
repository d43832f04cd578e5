//! Codec abstraction: the inner-serializer contract, the stock JSON codec,
//! and the encrypting wrapper that chains serialization with envelope
//! encryption.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::crypto;
use crate::error::{EnvelopeError, Result};
use crate::provider::KeyProvider;

/// Serializes values to bytes and back.
///
/// Implementations report their failures as
/// [`EnvelopeError::InnerEncode`] / [`EnvelopeError::InnerDecode`] so that
/// callers of an encrypting wrapper can tell serializer failures apart from
/// envelope failures.
pub trait Codec: Send + Sync {
    /// A stable identifier for the format, e.g. `"json"`.
    fn name(&self) -> &str;

    /// Serializes a value to bytes.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Deserializes a value from bytes.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T>;
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &str {
        "json"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| EnvelopeError::InnerEncode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        serde_json::from_slice(data).map_err(|e| EnvelopeError::InnerDecode(e.to_string()))
    }
}

/// Wraps an inner codec with envelope encryption.
///
/// On encode, the inner codec serializes the value and the result is
/// encrypted under the provider's current key. On decode, the envelope is
/// decrypted (looking the key up by the ID in its header) and the plaintext
/// handed to the inner codec.
///
/// The wrapper is safe for concurrent use whenever the inner codec and the
/// key provider are; [`StaticKeyProvider`](crate::StaticKeyProvider)
/// satisfies this.
pub struct EncryptedCodec<C, P> {
    inner: C,
    provider: Arc<P>,
    name: String,
}

impl<C: Codec, P: KeyProvider> EncryptedCodec<C, P> {
    /// Creates an encrypting codec that wraps `inner`.
    ///
    /// The codec name is `"encrypted:<inner>"`, e.g. `"encrypted:json"`.
    pub fn new(inner: C, provider: Arc<P>) -> Self {
        let name = format!("encrypted:{}", inner.name());
        Self {
            inner,
            provider,
            name,
        }
    }
}

impl<C: Codec, P: KeyProvider> Codec for EncryptedCodec<C, P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let plaintext = self.inner.encode(value)?;
        let key = self.provider.current_key()?;
        crypto::encrypt(&plaintext, &key)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        let plaintext = crypto::decrypt(data, self.provider.as_ref())?;
        self.inner.decode(&plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Key, StaticKeyProvider};
    use serde::Deserialize;

    fn make_key(size: usize) -> Vec<u8> {
        (0..size).map(|i| i as u8).collect()
    }

    fn test_codec() -> EncryptedCodec<JsonCodec, StaticKeyProvider> {
        let provider = StaticKeyProvider::new(&make_key(32), "test-key").unwrap();
        EncryptedCodec::new(JsonCodec, Arc::new(provider))
    }

    #[test]
    fn test_codec_name() {
        assert_eq!(test_codec().name(), "encrypted:json");
    }

    #[test]
    fn test_round_trip_string() {
        let c = test_codec();

        let data = c.encode("hello world").unwrap();
        // 93 bytes of overhead + 8-byte key ID + 13 bytes of JSON.
        assert_eq!(data.len(), 114);
        assert!(!data
            .windows(b"hello world".len())
            .any(|w| w == b"hello world"));

        let got: String = c.decode(&data).unwrap();
        assert_eq!(got, "hello world");
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Config {
        host: String,
        port: u16,
    }

    #[test]
    fn test_round_trip_struct() {
        let c = test_codec();
        let original = Config {
            host: "localhost".into(),
            port: 8080,
        };

        let data = c.encode(&original).unwrap();
        let got: Config = c.decode(&data).unwrap();
        assert_eq!(got, original);
    }

    #[test]
    fn test_round_trip_map() {
        let c = test_codec();
        let original = serde_json::json!({"key": "value", "num": 42});

        let data = c.encode(&original).unwrap();
        let got: serde_json::Value = c.decode(&data).unwrap();
        assert_eq!(got, original);
    }

    #[test]
    fn test_round_trip_int() {
        let c = test_codec();

        let data = c.encode(&42i64).unwrap();
        let got: i64 = c.decode(&data).unwrap();
        assert_eq!(got, 42);
    }

    #[test]
    fn test_round_trip_empty_string() {
        let c = test_codec();

        let data = c.encode("").unwrap();
        let got: String = c.decode(&data).unwrap();
        assert_eq!(got, "");
    }

    #[test]
    fn test_key_rotation() {
        let old_key = make_key(32);
        let new_key: Vec<u8> = (0u8..32).map(|i| i + 50).collect();

        // Encrypt with the old key.
        let old_provider = StaticKeyProvider::new(&old_key, "key-v1").unwrap();
        let old_codec = EncryptedCodec::new(JsonCodec, Arc::new(old_provider));
        let data = old_codec.encode("secret").unwrap();

        // Decrypt with a rotated provider holding both keys.
        let new_provider = StaticKeyProvider::builder(&new_key, "key-v2")
            .with_old_key(&old_key, "key-v1")
            .build()
            .unwrap();
        let new_codec = EncryptedCodec::new(JsonCodec, Arc::new(new_provider));

        let got: String = new_codec.decode(&data).unwrap();
        assert_eq!(got, "secret");

        // New encryptions carry the new key's ID in the header.
        let reencrypted = new_codec.encode("x").unwrap();
        assert_eq!(&reencrypted[5..11], b"key-v2");
    }

    #[test]
    fn test_wrong_key() {
        let c = test_codec();
        let data = c.encode("secret").unwrap();

        let wrong_provider = StaticKeyProvider::new(&[0xFF; 32], "test-key").unwrap();
        let wrong_codec = EncryptedCodec::new(JsonCodec, Arc::new(wrong_provider));

        let err = wrong_codec.decode::<String>(&data).unwrap_err();
        assert!(matches!(err, EnvelopeError::DecryptionFailed(_)));
    }

    #[test]
    fn test_key_not_found() {
        let old_provider = StaticKeyProvider::new(&make_key(32), "key-v1").unwrap();
        let old_codec = EncryptedCodec::new(JsonCodec, Arc::new(old_provider));
        let data = old_codec.encode("secret").unwrap();

        let provider = StaticKeyProvider::new(&make_key(32), "key-v2").unwrap();
        let codec = EncryptedCodec::new(JsonCodec, Arc::new(provider));

        let err = codec.decode::<String>(&data).unwrap_err();
        assert!(matches!(err, EnvelopeError::KeyNotFound(_)));
    }

    #[test]
    fn test_tampered_data() {
        let c = test_codec();
        let mut data = c.encode("secret").unwrap();

        let last = data.len() - 1;
        data[last] ^= 0xFF;

        let err = c.decode::<String>(&data).unwrap_err();
        assert!(matches!(err, EnvelopeError::DecryptionFailed(_)));
    }

    #[test]
    fn test_tampered_wrapped_dek() {
        let c = test_codec();
        let mut data = c.encode("secret").unwrap();

        // Flip a byte in the wrapped DEK region: 5 + len("test-key") + 12.
        data[5 + 8 + 12] ^= 0xFF;

        let err = c.decode::<String>(&data).unwrap_err();
        assert!(matches!(err, EnvelopeError::DecryptionFailed(_)));
    }

    #[test]
    fn test_decode_garbage() {
        let c = test_codec();
        let err = c.decode::<String>(b"not encrypted").unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidFormat(_)));
    }

    #[test]
    fn test_inner_decode_failure_distinct() {
        let c = test_codec();
        let data = c.encode("hello").unwrap();

        // Decryption succeeds; deserializing a string into u32 cannot.
        let err = c.decode::<u32>(&data).unwrap_err();
        assert!(matches!(err, EnvelopeError::InnerDecode(_)));
    }

    #[test]
    fn test_inner_encode_failure_distinct() {
        let c = test_codec();

        // JSON requires string map keys.
        let mut bad = std::collections::HashMap::new();
        bad.insert(vec![1u8, 2u8], "value");

        let err = c.encode(&bad).unwrap_err();
        assert!(matches!(err, EnvelopeError::InnerEncode(_)));
    }

    /// Provider whose lookups always fail.
    struct FailingProvider;

    impl KeyProvider for FailingProvider {
        fn current_key(&self) -> Result<Key> {
            Err(EnvelopeError::Internal("key unavailable".into()))
        }

        fn key_by_id(&self, _id: &str) -> Result<Key> {
            Err(EnvelopeError::Internal("key unavailable".into()))
        }
    }

    #[test]
    fn test_encode_provider_failure_propagates() {
        let c = EncryptedCodec::new(JsonCodec, Arc::new(FailingProvider));
        let err = c.encode("test").unwrap_err();
        assert!(matches!(err, EnvelopeError::Internal(_)));
    }

    #[test]
    fn test_destroyed_provider() {
        let provider = Arc::new(StaticKeyProvider::new(&make_key(32), "test-key").unwrap());
        let c = EncryptedCodec::new(JsonCodec, Arc::clone(&provider));

        provider.destroy();

        let err = c.encode("test").unwrap_err();
        assert!(matches!(err, EnvelopeError::ProviderDestroyed));
    }

    #[test]
    fn test_different_encryptions_same_input() {
        let c = test_codec();

        let d1 = c.encode("same input").unwrap();
        let d2 = c.encode("same input").unwrap();
        assert_ne!(d1, d2);

        let g1: String = c.decode(&d1).unwrap();
        let g2: String = c.decode(&d2).unwrap();
        assert_eq!(g1, g2);
    }

    #[test]
    fn test_large_payload() {
        let c = test_codec();
        let large: Vec<u8> = (0..1 << 20).map(|i| (i % 256) as u8).collect();

        let data = c.encode(&large).unwrap();
        let got: Vec<u8> = c.decode(&data).unwrap();
        assert_eq!(got, large);
    }

    #[test]
    fn test_concurrent_encode_decode() {
        let c = Arc::new(test_codec());

        let mut handles = Vec::new();
        for n in 0..100i64 {
            let c = Arc::clone(&c);
            handles.push(std::thread::spawn(move || {
                let data = c.encode(&n).unwrap();
                let got: i64 = c.decode(&data).unwrap();
                assert_eq!(got, n);
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }
}
