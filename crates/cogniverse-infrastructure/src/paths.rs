//! Unified path management for cogniverse configuration and data files.

use std::path::{Path, PathBuf};

/// Environment variable that relocates the whole cogniverse directory.
pub const HOME_ENV: &str = "COGNIVERSE_HOME";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Resolved locations of every file the client reads or writes.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/cogniverse/        # Root ($COGNIVERSE_HOME overrides)
/// ├── config.toml              # Endpoint, sampling, cache and context settings
/// ├── secret.json              # API key
/// ├── storage/                 # One file per persisted key (chats, preferences)
/// └── logs/                    # Daily rolling log files
///     └── cogniverse.log.YYYY-MM-DD
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CogniversePaths {
    root: PathBuf,
}

impl CogniversePaths {
    /// Resolves the root from `$COGNIVERSE_HOME`, falling back to
    /// `~/.config/cogniverse`.
    pub fn resolve() -> Result<Self, PathError> {
        let override_root = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty());
        Self::resolve_with(override_root.map(PathBuf::from))
    }

    fn resolve_with(override_root: Option<PathBuf>) -> Result<Self, PathError> {
        if let Some(root) = override_root {
            return Ok(Self::from_root(root));
        }
        let home = dirs::home_dir().ok_or(PathError::HomeDirNotFound)?;
        Ok(Self::from_root(home.join(".config").join("cogniverse")))
    }

    /// Uses `root` directly (tests, portable installs).
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Ensure this file has appropriate permissions (e.g., 600).
    pub fn secret_file(&self) -> PathBuf {
        self.root.join("secret.json")
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.root.join("storage")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Creates the root, storage and logs directories if missing.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [self.root.clone(), self.storage_dir(), self.logs_dir()] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}
