//! Error types for the Cogniverse chat client.

use crate::completion::CompletionError;
use thiserror::Error;

/// A shared error type for the Cogniverse crates.
///
/// Variants are constructed where the failure happens; nothing downstream
/// inspects message text to recover the category.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CogniverseError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Import payload could not be understood.
    #[error("Format error: {0}")]
    Format(String),

    /// Access to a file or device was denied.
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote completion failed.
    #[error(transparent)]
    Completion(#[from] CompletionError),

    /// Caller supplied something unusable (e.g. a blank message).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CogniverseError {
    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Format error
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a Format error
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }

    /// Check if this is a Permission error
    pub fn is_permission(&self) -> bool {
        matches!(self, Self::Permission(_))
    }
}

impl From<std::io::Error> for CogniverseError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::Permission(err.to_string());
        }
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for CogniverseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for CogniverseError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for CogniverseError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<minijinja::Error> for CogniverseError {
    fn from(err: minijinja::Error) -> Self {
        Self::Internal(format!("Template error: {err}"))
    }
}

/// A type alias for `Result<T, CogniverseError>`.
pub type Result<T> = std::result::Result<T, CogniverseError>;
