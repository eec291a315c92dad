//! Secret configuration file storage.
//!
//! Loads the API key from `secret.json`, falling back to the
//! `COGNIVERSE_API_KEY` environment variable.

use super::atomic_file::{AtomicFileError, write_atomic};
use cogniverse_core::config::SecretConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable consulted when `secret.json` carries no key.
pub const API_KEY_ENV: &str = "COGNIVERSE_API_KEY";

/// Errors that can occur during secret storage operations.
#[derive(Debug)]
pub enum SecretStorageError {
    /// Configuration file not found.
    NotFound(PathBuf),
    /// File I/O error.
    IoError(std::io::Error),
    /// JSON parsing error.
    ParseError(serde_json::Error),
}

impl std::fmt::Display for SecretStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretStorageError::NotFound(path) => {
                write!(f, "Secret file not found at: {}", path.display())
            }
            SecretStorageError::IoError(e) => write!(f, "I/O error: {}", e),
            SecretStorageError::ParseError(e) => write!(f, "JSON parse error: {}", e),
        }
    }
}

impl std::error::Error for SecretStorageError {}

impl From<std::io::Error> for SecretStorageError {
    fn from(e: std::io::Error) -> Self {
        SecretStorageError::IoError(e)
    }
}

impl From<serde_json::Error> for SecretStorageError {
    fn from(e: serde_json::Error) -> Self {
        SecretStorageError::ParseError(e)
    }
}

impl From<AtomicFileError> for SecretStorageError {
    fn from(e: AtomicFileError) -> Self {
        match e {
            AtomicFileError::IoError(e) => SecretStorageError::IoError(e),
            AtomicFileError::LockError(msg) => {
                SecretStorageError::IoError(std::io::Error::other(msg))
            }
        }
    }
}

/// Storage for the secret configuration file (secret.json).
///
/// # Security Note
///
/// The file is plaintext JSON. [`SecretStorage::ensure_template`] creates it
/// with mode 600 on Unix; keys are never logged.
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the secret configuration from the JSON file.
    pub fn load(&self) -> Result<SecretConfig, SecretStorageError> {
        if !self.path.exists() {
            return Err(SecretStorageError::NotFound(self.path.clone()));
        }

        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Resolves the effective secrets: the file's key if usable, otherwise
    /// `$COGNIVERSE_API_KEY`. An unreadable file is logged and skipped.
    pub fn resolve(&self) -> SecretConfig {
        self.resolve_with(std::env::var(API_KEY_ENV).ok())
    }

    fn resolve_with(&self, env_key: Option<String>) -> SecretConfig {
        let from_file = match self.load() {
            Ok(config) => config,
            Err(SecretStorageError::NotFound(_)) => SecretConfig::default(),
            Err(e) => {
                tracing::warn!("Ignoring unreadable secret file: {}", e);
                SecretConfig::default()
            }
        };

        if from_file.has_api_key() {
            return from_file;
        }

        let from_env = SecretConfig { api_key: env_key };
        if from_env.has_api_key() {
            tracing::debug!("Using API key from ${}", API_KEY_ENV);
            return from_env;
        }

        SecretConfig::default()
    }

    /// Creates a template `secret.json` with an empty key if none exists.
    pub fn ensure_template(&self) -> Result<(), SecretStorageError> {
        if self.path.exists() {
            return Ok(());
        }

        let template = serde_json::to_string_pretty(&SecretConfig {
            api_key: Some(String::new()),
        })?;
        write_atomic(&self.path, template.as_bytes())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}
