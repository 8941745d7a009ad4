// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory storage backend fake for testing without filesystem I/O.

use kickstart_app_core::config::{StorageBackend, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory implementation of [`StorageBackend`] for testing.
///
/// Clones share state, so a test can hand one clone to the services and keep
/// another to inspect raw keys. Call counts and failure injection mirror what
/// a browser storage quota error would look like to callers.
///
/// # Example
///
/// ```
/// use kickstart_dry_tests::InMemoryStorage;
/// use kickstart_app_core::PersistentStore;
///
/// let storage = InMemoryStorage::new();
/// let store = PersistentStore::new(storage.clone());
///
/// store.set_item("theme", &"dark").unwrap();
/// assert!(storage.contains_key("theme"));
/// assert_eq!(storage.raw_string("theme").as_deref(), Some("\"dark\""));
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    inner: Arc<Mutex<InMemoryStorageInner>>,
}

#[derive(Default)]
struct InMemoryStorageInner {
    data: HashMap<String, Vec<u8>>,
    load_count: usize,
    save_count: usize,
    remove_count: usize,
    fail_on_load: bool,
    fail_on_save: bool,
}

impl InMemoryStorage {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given key-value pairs.
    ///
    /// Useful to simulate keys written by some other part of the page.
    pub fn with_data(data: HashMap<String, Vec<u8>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(InMemoryStorageInner {
                data,
                ..Default::default()
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryStorageInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Configure the store to fail on load operations.
    pub fn set_fail_on_load(&self, fail: bool) {
        self.lock().fail_on_load = fail;
    }

    /// Configure the store to fail on save operations (e.g. quota exceeded).
    pub fn set_fail_on_save(&self, fail: bool) {
        self.lock().fail_on_save = fail;
    }

    /// Number of `load_raw` attempts, including failed ones.
    pub fn load_count(&self) -> usize {
        self.lock().load_count
    }

    /// Number of `save_raw` attempts, including failed ones.
    pub fn save_count(&self) -> usize {
        self.lock().save_count
    }

    /// Number of `remove_raw` calls.
    pub fn remove_count(&self) -> usize {
        self.lock().remove_count
    }

    /// Keys currently present, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().data.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Check if a key exists in the store.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().data.contains_key(key)
    }

    /// Raw value under `key` as UTF-8, if present.
    pub fn raw_string(&self, key: &str) -> Option<String> {
        self.lock()
            .data
            .get(key)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Reset the store to its initial empty state (data, counters and flags).
    pub fn reset(&self) {
        let mut inner = self.lock();
        *inner = InMemoryStorageInner::default();
    }
}

impl StorageBackend for InMemoryStorage {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let mut inner = self.lock();
        inner.load_count += 1;

        if inner.fail_on_load {
            return Err(StoreError::Other("simulated load failure".into()));
        }

        inner.data.get(key).cloned().ok_or(StoreError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.save_count += 1;

        if inner.fail_on_save {
            return Err(StoreError::Other("simulated quota exceeded".into()));
        }

        inner.data.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.remove_count += 1;
        inner.data.remove(key);
        Ok(())
    }
}
