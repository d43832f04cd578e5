//! Key providers: the `Key` value type, the `KeyProvider` trait, and the
//! in-memory `StaticKeyProvider`.
//!
//! A provider owns a set of 32-byte keys identified by unique string IDs,
//! one of which is current. Encryption always uses the current key;
//! decryption looks keys up by the ID carried in the envelope header, which
//! is what makes key rotation possible without re-encrypting old payloads.

use std::collections::HashMap;

use parking_lot::RwLock;
use zeroize::{Zeroize, Zeroizing, ZeroizeOnDrop};

use crate::error::{EnvelopeError, Result};
use crate::format::KEY_SIZE;

/// A named encryption key.
///
/// The raw bytes are owned by the `Key` and zeroized when it is dropped.
/// Providers hand out fresh copies, so holding or dropping a `Key` never
/// affects provider state.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Key {
    #[zeroize(skip)]
    id: String,
    bytes: Vec<u8>,
}

impl Key {
    /// Creates a key from an ID and raw key material.
    pub fn new(id: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            bytes: bytes.into(),
        }
    }

    /// The key's unique identifier, e.g. `"key-2024-01"`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The raw key material. Must be 32 bytes for AES-256.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Key")
            .field("id", &self.id)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Abstracts key retrieval for encryption and decryption.
///
/// Implementations must be safe for concurrent use.
pub trait KeyProvider: Send + Sync {
    /// Returns the key to use for new encryptions.
    fn current_key(&self) -> Result<Key>;

    /// Returns the key with the given ID, used for decryption.
    ///
    /// Fails with [`EnvelopeError::KeyNotFound`] if the ID is unknown.
    fn key_by_id(&self, id: &str) -> Result<Key>;
}

#[derive(Debug)]
struct ProviderState {
    destroyed: bool,
    current_id: String,
    current: Zeroizing<Vec<u8>>,
    keys: HashMap<String, Zeroizing<Vec<u8>>>,
}

/// A [`KeyProvider`] backed by in-memory keys.
///
/// Key bytes are copied in on construction and copied out on every lookup;
/// the provider never shares its internal buffers. [`destroy`](Self::destroy)
/// zeroizes all stored key material and permanently disables the provider.
#[derive(Debug)]
pub struct StaticKeyProvider {
    state: RwLock<ProviderState>,
}

impl StaticKeyProvider {
    /// Creates a provider holding a single current key.
    ///
    /// `bytes` must be 32 bytes (AES-256) and `id` must not be empty. The
    /// bytes are copied; the caller may zero its buffer afterwards.
    pub fn new(bytes: &[u8], id: impl Into<String>) -> Result<Self> {
        Self::builder(bytes, id).build()
    }

    /// Starts building a provider with the given current key. Old keys for
    /// rotation-era decryption can be added with
    /// [`with_old_key`](StaticKeyProviderBuilder::with_old_key).
    pub fn builder(bytes: &[u8], id: impl Into<String>) -> StaticKeyProviderBuilder {
        StaticKeyProviderBuilder {
            current: (Zeroizing::new(bytes.to_vec()), id.into()),
            old_keys: Vec::new(),
        }
    }

    /// Zeroizes every stored key and permanently disables the provider.
    ///
    /// All subsequent operations fail with [`EnvelopeError::ProviderDestroyed`].
    /// Calling destroy again is a no-op.
    pub fn destroy(&self) {
        let mut state = self.state.write();
        if state.destroyed {
            return;
        }
        // Dropping the Zeroizing buffers overwrites the key bytes.
        state.keys.clear();
        state.current.zeroize();
        state.destroyed = true;
    }
}

impl KeyProvider for StaticKeyProvider {
    fn current_key(&self) -> Result<Key> {
        let state = self.state.read();
        if state.destroyed {
            return Err(EnvelopeError::ProviderDestroyed);
        }
        Ok(Key::new(state.current_id.clone(), state.current.to_vec()))
    }

    fn key_by_id(&self, id: &str) -> Result<Key> {
        let state = self.state.read();
        if state.destroyed {
            return Err(EnvelopeError::ProviderDestroyed);
        }
        match state.keys.get(id) {
            Some(bytes) => Ok(Key::new(id, bytes.to_vec())),
            None => Err(EnvelopeError::KeyNotFound(id.to_owned())),
        }
    }
}

/// Builder for [`StaticKeyProvider`].
///
/// Key bytes are copied into zeroizing buffers as they are added; all
/// validation is deferred to [`build`](Self::build), which reports the first
/// violation.
pub struct StaticKeyProviderBuilder {
    current: (Zeroizing<Vec<u8>>, String),
    old_keys: Vec<(Zeroizing<Vec<u8>>, String)>,
}

impl StaticKeyProviderBuilder {
    /// Adds a previous key kept for decryption during key rotation.
    ///
    /// Same validation rules as the current key: 32 bytes, non-empty ID.
    pub fn with_old_key(mut self, bytes: &[u8], id: impl Into<String>) -> Self {
        self.old_keys.push((Zeroizing::new(bytes.to_vec()), id.into()));
        self
    }

    /// Validates all keys and constructs the provider.
    pub fn build(self) -> Result<StaticKeyProvider> {
        let (current_bytes, current_id) = self.current;
        if current_bytes.len() != KEY_SIZE {
            return Err(EnvelopeError::InvalidKeySize(current_bytes.len()));
        }
        if current_id.is_empty() {
            return Err(EnvelopeError::InvalidKeyId(
                "key ID must not be empty".into(),
            ));
        }

        let mut keys = HashMap::with_capacity(1 + self.old_keys.len());
        keys.insert(current_id.clone(), Zeroizing::new(current_bytes.to_vec()));

        for (bytes, id) in self.old_keys {
            if bytes.len() != KEY_SIZE {
                return Err(EnvelopeError::InvalidKeySize(bytes.len()));
            }
            if id.is_empty() {
                return Err(EnvelopeError::InvalidKeyId(
                    "old key ID must not be empty".into(),
                ));
            }
            keys.insert(id, bytes);
        }

        Ok(StaticKeyProvider {
            state: RwLock::new(ProviderState {
                destroyed: false,
                current_id,
                current: current_bytes,
                keys,
            }),
        })
    }
}
