//! Snapshot error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur during snapshot operations.
///
/// `record_snapshot` and `undo` never surface these; they log and degrade.
/// Errors reach callers only from setup (opening a store, loading config)
/// and from the coordinator's own document writes.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Invalid configuration in {source_name}: {message}")]
    Config {
        source_name: String,
        message: String,
    },

    /// A path could not be used.
    #[error("Invalid path {}: {reason}", path.display())]
    InvalidPath { path: PathBuf, reason: String },

    /// Operation failed.
    #[error("Snapshot operation failed: {0}")]
    OperationFailed(String),
}

impl SnapshotError {
    /// Create a configuration error.
    pub fn config(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an operation failed error.
    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::OperationFailed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_its_source() {
        let err = SnapshotError::config("savepoint.json", "max_history must be at least 1");
        assert_eq!(
            err.to_string(),
            "Invalid configuration in savepoint.json: max_history must be at least 1"
        );
    }

    #[test]
    fn invalid_path_displays_path() {
        let err = SnapshotError::invalid_path("/tmp/x", "not a directory");
        assert_eq!(err.to_string(), "Invalid path /tmp/x: not a directory");
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = SnapshotError::from(io_err);
        assert!(err.to_string().starts_with("IO error"));
    }

    #[test]
    fn json_error_converts() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = SnapshotError::from(json_err);
        assert!(err.to_string().starts_with("Serialization error"));
    }
}
