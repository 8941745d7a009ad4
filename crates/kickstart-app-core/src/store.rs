// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON key-value store that remembers every key it wrote.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::config::{decode_json, StorageBackend, StoreError};

/// Reserved key holding the JSON array of every key written through the store.
pub const ALL_KEYS: &str = "TKG_KICKSTART_ALL_KEYS";

/// Durable JSON store layered over a shared [`StorageBackend`].
///
/// The backend namespace is shared, so the store keeps a side index under
/// [`ALL_KEYS`] and [`PersistentStore::clear`] only removes keys listed there.
/// Backend and serialization errors are returned unchanged; there is no retry.
///
/// Clones share one write lock. Every write, and every read-modify-write done
/// through [`PersistentStore::update_item`], runs under it, so services that
/// hold clones of the same store never lose each other's updates.
#[derive(Debug, Clone)]
pub struct PersistentStore<S> {
    backend: S,
    write_lock: Arc<Mutex<()>>,
}

impl<S> PersistentStore<S> {
    /// Wrap a backend.
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Borrow the underlying backend.
    pub fn backend(&self) -> &S {
        &self.backend
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S> PersistentStore<S>
where
    S: StorageBackend,
{
    /// Serialize `value` under `key` and record the key in the index.
    pub fn set_item<T>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        let _guard = self.lock();
        self.write_item(key, value)
    }

    /// Read the value under `key`, let `f` change it, and write it back, all
    /// under the write lock.
    ///
    /// `f` returns `None` to leave the stored value untouched. Returns whether
    /// a write happened.
    pub fn update_item<T, F>(&self, key: &str, f: F) -> Result<bool, StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> Option<T>,
    {
        let _guard = self.lock();
        let Some(updated) = f(self.get_item(key)?) else {
            return Ok(false);
        };
        self.write_item(key, &updated)?;
        Ok(true)
    }

    /// Deserialize the value under `key`. Returns `Ok(None)` when absent.
    pub fn get_item<T>(&self, key: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        decode_json(self.backend.load_raw(key))
    }

    /// Remove `key` and drop it from the index. Missing keys are ignored.
    pub fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.backend.remove_raw(key)?;
        let mut keys = self.keys()?;
        let before = keys.len();
        keys.retain(|k| k != key);
        if keys.len() != before {
            self.save_index(&keys)?;
        }
        Ok(())
    }

    /// Remove every key this store has written, then the index itself.
    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock();
        let keys = self.keys()?;
        debug!(count = keys.len(), "clearing persistent store");
        for key in &keys {
            self.backend.remove_raw(key)?;
        }
        self.backend.remove_raw(ALL_KEYS)
    }

    /// Keys written through this store, in first-write order.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.get_item::<Vec<String>>(ALL_KEYS)?.unwrap_or_default())
    }

    // Caller holds the write lock.
    fn write_item<T>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        let data = serde_json::to_vec(value)?;
        self.backend.save_raw(key, &data)?;
        let mut keys = self.keys()?;
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_owned());
            self.save_index(&keys)?;
        }
        Ok(())
    }

    fn save_index(&self, keys: &[String]) -> Result<(), StoreError> {
        let data = serde_json::to_vec(keys)?;
        self.backend.save_raw(ALL_KEYS, &data)
    }
}
