use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::atomic_io::{read_text_if_present, remove_if_present, write_text_atomic};
use super::{SyncError, TokenStorage};

/// One file per key inside a state directory.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    dir: PathBuf,
}

impl FileTokenStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, SyncError> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(SyncError::InvalidStorageKey {
                key: key.to_string(),
            });
        }
        Ok(self.dir.join(key))
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self, key: &str) -> Result<Option<String>, SyncError> {
        let path = self.path_for(key)?;
        let text = read_text_if_present(&path)
            .map_err(|source| SyncError::StorageRead { path, source })?;
        Ok(text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    fn store(&mut self, key: &str, token: &str) -> Result<(), SyncError> {
        let path = self.path_for(key)?;
        write_text_atomic(&path, token).map_err(|source| SyncError::StorageWrite { path, source })
    }

    fn remove(&mut self, key: &str) -> Result<(), SyncError> {
        let path = self.path_for(key)?;
        remove_if_present(&path).map_err(|source| SyncError::StorageWrite { path, source })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStorage {
    entries: HashMap<String, String>,
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self, key: &str) -> Result<Option<String>, SyncError> {
        Ok(self.entries.get(key).cloned())
    }

    fn store(&mut self, key: &str, token: &str) -> Result<(), SyncError> {
        self.entries.insert(key.to_string(), token.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SyncError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::sync::STORAGE_KEY;

    #[test]
    fn file_storage_persists_and_removes_key() {
        let temp = TempDir::new().expect("tempdir");
        let mut storage = FileTokenStorage::new(temp.path().join("state"));
        assert_eq!(storage.load(STORAGE_KEY).expect("load empty"), None);

        storage.store(STORAGE_KEY, "li.3k").expect("store");
        let reopened = FileTokenStorage::new(temp.path().join("state"));
        assert_eq!(
            reopened.load(STORAGE_KEY).expect("load"),
            Some("li.3k".to_string())
        );

        storage.remove(STORAGE_KEY).expect("remove");
        assert!(!temp.path().join("state").join(STORAGE_KEY).exists());
        storage.remove(STORAGE_KEY).expect("remove twice");
    }

    #[test]
    fn file_storage_rejects_path_like_keys() {
        let temp = TempDir::new().expect("tempdir");
        let mut storage = FileTokenStorage::new(temp.path());
        for key in ["", "..", "a/b", "a\\b"] {
            assert!(matches!(
                storage.store(key, "x"),
                Err(SyncError::InvalidStorageKey { .. })
            ));
        }
    }
}
