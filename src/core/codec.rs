//! Payload versioning and encoding.

use crate::error::{Result, StoreError};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A configuration payload that carries its own version number.
///
/// Identity is by version: two payloads with the same version are the same
/// configuration as far as the store is concerned.
///
/// # Examples
///
/// ```rust
/// use hotswap_store::prelude::*;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct ServiceConfig {
///     version: i64,
///     max_requests: u32,
/// }
///
/// impl Versioned for ServiceConfig {
///     fn version(&self) -> i64 {
///         self.version
///     }
/// }
/// ```
pub trait Versioned {
    /// The version number of this configuration (non-negative).
    fn version(&self) -> i64;
}

/// Converts configurations to and from the bytes stored in the `Config` column.
pub trait ConfigCodec<T>: Send + Sync + 'static {
    /// Encode a configuration payload.
    fn encode(&self, config: &T) -> Result<Vec<u8>>;

    /// Decode a configuration payload.
    fn decode(&self, bytes: &[u8]) -> Result<T>;
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> ConfigCodec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, config: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(config).map_err(|e| StoreError::SerializationError(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::DeserializationError(e.to_string()))
    }
}
