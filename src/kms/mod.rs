//! KMS-backed key provider construction.
//!
//! Each adapter unwraps encrypted key material through an external
//! key-management service at construction time, copies the plaintext keys
//! into a [`StaticKeyProvider`](crate::StaticKeyProvider), and zeroizes the
//! service's plaintext buffers. The service client is only used during
//! construction and is never retained; after that the provider is purely
//! in-memory.
//!
//! Every adapter follows the same shape: a client trait exposing the
//! service's single unwrap operation, a builder collecting encrypted key
//! entries (the first entry becomes the current key, the rest are
//! rotation-era keys in declared order), and an async `build` that performs
//! the service calls.

pub mod aws;
pub mod azure;
pub mod gcp;
pub mod vault;

/// Error type returned by adapter client traits.
pub type ClientError = Box<dyn std::error::Error + Send + Sync>;
