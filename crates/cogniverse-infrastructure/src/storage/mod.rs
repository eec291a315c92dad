//! Storage layer: atomic file writes, the key/value file store, config and secrets.

mod atomic_file;
mod config_storage;
mod file_store;
mod secret_storage;

pub use atomic_file::{AtomicFileError, write_atomic};
pub use config_storage::{ConfigStorage, ConfigStorageError};
pub use file_store::{FileStore, FileStoreError};
pub use secret_storage::{API_KEY_ENV, SecretStorage, SecretStorageError};
