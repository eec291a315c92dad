//! Directory-backed key/value store.

use super::atomic_file::{AtomicFileError, write_atomic};
use cogniverse_core::error::{CogniverseError, Result};
use cogniverse_core::storage::KeyValueStore;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Errors that can occur during file store operations.
#[derive(Debug)]
pub enum FileStoreError {
    /// File I/O error.
    IoError(std::io::Error),
    /// File locking error.
    LockError(String),
    /// Key cannot be used as a file name.
    InvalidKey(String),
}

impl std::fmt::Display for FileStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileStoreError::IoError(e) => write!(f, "I/O error: {}", e),
            FileStoreError::LockError(e) => write!(f, "Lock error: {}", e),
            FileStoreError::InvalidKey(key) => write!(f, "Invalid storage key: '{}'", key),
        }
    }
}

impl std::error::Error for FileStoreError {}

impl From<std::io::Error> for FileStoreError {
    fn from(e: std::io::Error) -> Self {
        FileStoreError::IoError(e)
    }
}

impl From<AtomicFileError> for FileStoreError {
    fn from(e: AtomicFileError) -> Self {
        match e {
            AtomicFileError::IoError(e) => FileStoreError::IoError(e),
            AtomicFileError::LockError(e) => FileStoreError::LockError(e),
        }
    }
}

impl From<FileStoreError> for CogniverseError {
    fn from(e: FileStoreError) -> Self {
        match e {
            FileStoreError::IoError(e) => e.into(),
            FileStoreError::LockError(msg) => CogniverseError::io(msg),
            FileStoreError::InvalidKey(key) => {
                CogniverseError::invalid_input(format!("Invalid storage key: '{key}'"))
            }
        }
    }
}

/// Persists each key as its own file under one directory.
///
/// Values are written verbatim. Writes are atomic (temp file + rename under
/// an exclusive lock), so a crash mid-save leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Keys are limited to ASCII alphanumerics, `-` and `_`.
    fn path_for(&self, key: &str) -> std::result::Result<PathBuf, FileStoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(FileStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }

    fn read(&self, key: &str) -> std::result::Result<Option<String>, FileStoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> std::result::Result<(), FileStoreError> {
        let path = self.path_for(key)?;
        write_atomic(&path, value.as_bytes())?;
        tracing::debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    fn delete(&self, key: &str) -> std::result::Result<(), FileStoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read(key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        Ok(self.write(key, value)?)
    }

    fn remove(&self, key: &str) -> Result<()> {
        Ok(self.delete(key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogniverse_core::session::{ChatHistory, Message, SessionId};
    use cogniverse_core::storage::{CHATS_KEY, ChatStorage};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("storage"));

        assert_eq!(store.get("cogniverse-theme").unwrap(), None);

        store.set("cogniverse-theme", "dark").unwrap();
        assert_eq!(store.get("cogniverse-theme").unwrap().as_deref(), Some("dark"));

        store.remove("cogniverse-theme").unwrap();
        assert_eq!(store.get("cogniverse-theme").unwrap(), None);

        // Removing again is fine.
        store.remove("cogniverse-theme").unwrap();
    }

    #[test]
    fn test_values_survive_a_new_handle() {
        let temp_dir = TempDir::new().unwrap();
        FileStore::new(temp_dir.path()).set(CHATS_KEY, "{}").unwrap();

        let reopened = FileStore::new(temp_dir.path());
        assert_eq!(reopened.get(CHATS_KEY).unwrap().as_deref(), Some("{}"));
        assert!(temp_dir.path().join(CHATS_KEY).is_file());
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        for key in ["", "../escape", "a/b", "dot.ted"] {
            let err = store.set(key, "x").unwrap_err();
            assert!(matches!(err, CogniverseError::InvalidInput(_)), "{key}");
        }
    }

    #[test]
    fn test_backs_chat_storage() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ChatStorage::new(Arc::new(FileStore::new(temp_dir.path())));

        let mut history = ChatHistory::new();
        history.push(SessionId(1_700_000_000_000), Message::user("persist me"));
        storage.save_history(&history);

        let storage = ChatStorage::new(Arc::new(FileStore::new(temp_dir.path())));
        assert_eq!(storage.load_history(), history);
    }
}
