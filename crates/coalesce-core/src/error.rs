//! Error types for consolidation and cleanup runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias used across the coalesce crates.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that stop a run (or a whole source root) from proceeding.
#[derive(Debug, Error)]
pub enum Error {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Path exists but is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The destination lives inside a source root, which would copy the
    /// destination into itself.
    #[error(
        "Destination {destination} is inside source root {source_root}; refusing to run"
    )]
    DestinationInsideSource {
        source_root: PathBuf,
        destination: PathBuf,
    },

    /// Reading an answer from a prompt failed.
    #[error("Prompt failed: {source}")]
    Prompt {
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// A non-fatal error attached to a single item of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    /// The path that caused the error.
    pub path: PathBuf,
    /// A human-readable error message.
    pub message: String,
}

impl OperationError {
    /// Create a new operation error.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

impl From<&Error> for OperationError {
    fn from(err: &Error) -> Self {
        let path = match err {
            Error::PermissionDenied { path }
            | Error::NotFound { path }
            | Error::Io { path, .. }
            | Error::NotADirectory { path } => path.clone(),
            Error::DestinationInsideSource { destination, .. } => destination.clone(),
            Error::InvalidConfig { .. } | Error::Prompt { .. } => PathBuf::new(),
        };
        Self::new(path, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_io_maps_kind() {
        let err = Error::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, Error::PermissionDenied { .. }));

        let err = Error::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, Error::NotFound { .. }));

        let err = Error::io("/test/path", std::io::Error::other("boom"));
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_operation_error_from_error() {
        let err = Error::NotADirectory {
            path: PathBuf::from("/src/file.txt"),
        };
        let op: OperationError = (&err).into();
        assert_eq!(op.path, PathBuf::from("/src/file.txt"));
        assert!(op.message.contains("Not a directory"));
        assert!(op.to_string().starts_with("/src/file.txt: "));
    }
}
