// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Filesystem-backed `StorageBackend` for Kickstart (uses platform data dir).

use directories::ProjectDirs;
use kickstart_app_core::config::{StorageBackend, StoreError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Store blobs as JSON files, one file per key.
#[derive(Debug, Clone)]
pub struct FsStorage {
    base: PathBuf,
}

impl FsStorage {
    /// Create a store rooted at the user data directory (e.g., `~/.local/share/kickstart`).
    pub fn new() -> Result<Self, StoreError> {
        let proj = ProjectDirs::from("dev", "flyingrobots", "Kickstart")
            .ok_or_else(|| StoreError::Other("could not resolve data dir".into()))?;
        Self::at(proj.data_dir())
    }

    /// Create a store rooted at an explicit directory.
    pub fn at(base: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base = base.as_ref().to_path_buf();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    /// Directory holding the key files.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(StoreError::Other(format!("invalid storage key: {key:?}")));
        }
        Ok(self.base.join(format!("{key}.json")))
    }
}

impl StorageBackend for FsStorage {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read(path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!(key, bytes = data.len(), "writing storage file");
        fs::write(path, data)?;
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }
}
