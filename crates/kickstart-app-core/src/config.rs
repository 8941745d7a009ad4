// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Storage port and typed settings access for Kickstart.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Storage port for raw blobs keyed by logical name.
///
/// Implementations share one flat namespace with other writers (the way a
/// browser's local storage is shared by everything on the origin), so callers
/// that need to clean up after themselves must track their own keys.
pub trait StorageBackend {
    /// Load a raw blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, StoreError>;
    /// Persist a raw blob, overwriting any previous value.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;
    /// Remove a blob. Removing a missing key is not an error.
    fn remove_raw(&self, key: &str) -> Result<(), StoreError>;
}

/// Error type for storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Stored bytes are not the JSON the caller expected, or a value failed to serialize.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Backend specific failure, e.g. quota exceeded.
    #[error("other: {0}")]
    Other(String),
}

/// Decode a backend read. Missing keys and empty blobs both mean "no value".
pub(crate) fn decode_json<T>(read: Result<Vec<u8>, StoreError>) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
{
    match read {
        Ok(bytes) if bytes.is_empty() => Ok(None),
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(StoreError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Typed settings stored outside the wizard's indexed data.
///
/// Unlike [`crate::store::PersistentStore`] it keeps no key index, so
/// [`crate::store::PersistentStore::clear`] never touches what it writes.
/// Values are pretty-printed so they stay hand-editable on disk.
pub struct ConfigService<S> {
    backend: S,
}

impl<S> ConfigService<S> {
    /// Settings access over `backend`.
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    /// Borrow the backend.
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Give the backend back.
    pub fn into_inner(self) -> S {
        self.backend
    }
}

impl<S> ConfigService<S>
where
    S: StorageBackend,
{
    /// Value under `key`, or `Ok(None)` when nothing is stored.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        decode_json(self.backend.load_raw(key))
    }

    /// Store `value` under `key`.
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let data = serde_json::to_vec_pretty(value)?;
        self.backend.save_raw(key, &data)
    }

    /// Delete the value under `key`.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.backend.remove_raw(key)
    }
}
