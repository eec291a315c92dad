//! `config.toml` storage.

use super::atomic_file::{AtomicFileError, write_atomic};
use cogniverse_core::CogniverseError;
use cogniverse_core::config::AppConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur during config storage operations.
#[derive(Debug)]
pub enum ConfigStorageError {
    /// File I/O error.
    IoError(std::io::Error),
    /// File locking error.
    LockError(String),
    /// File parsed but failed validation, or could not be parsed.
    Invalid(CogniverseError),
}

impl std::fmt::Display for ConfigStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigStorageError::IoError(e) => write!(f, "I/O error: {}", e),
            ConfigStorageError::LockError(e) => write!(f, "Lock error: {}", e),
            ConfigStorageError::Invalid(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ConfigStorageError {}

impl From<std::io::Error> for ConfigStorageError {
    fn from(e: std::io::Error) -> Self {
        ConfigStorageError::IoError(e)
    }
}

impl From<AtomicFileError> for ConfigStorageError {
    fn from(e: AtomicFileError) -> Self {
        match e {
            AtomicFileError::IoError(e) => ConfigStorageError::IoError(e),
            AtomicFileError::LockError(e) => ConfigStorageError::LockError(e),
        }
    }
}

impl From<CogniverseError> for ConfigStorageError {
    fn from(e: CogniverseError) -> Self {
        ConfigStorageError::Invalid(e)
    }
}

/// Reads and writes the application configuration file.
///
/// Responsibilities:
/// - Parse `config.toml` into [`AppConfig`] (missing or empty file = defaults)
/// - Write the default file on first run
///
/// Does NOT:
/// - Touch secrets (see `SecretStorage`)
pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and validates the configuration.
    pub fn load(&self) -> Result<AppConfig, ConfigStorageError> {
        if !self.path.exists() {
            tracing::debug!("No config at {}, using defaults", self.path.display());
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        Ok(AppConfig::from_toml_str(&content)?)
    }

    /// Saves data to the config file atomically.
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigStorageError> {
        let toml_string = config.to_toml_string()?;
        write_atomic(&self.path, toml_string.as_bytes())?;
        Ok(())
    }

    /// Writes the default configuration if no file exists yet.
    ///
    /// Returns `true` when a file was created.
    pub fn ensure_default(&self) -> Result<bool, ConfigStorageError> {
        if self.path.exists() {
            return Ok(false);
        }
        self.save(&AppConfig::default())?;
        tracing::info!("Wrote default config to {}", self.path.display());
        Ok(true)
    }
}
