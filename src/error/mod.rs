//! Unified error type for sentinel-scan.
//!
//! Pipeline components carry their own error enums (`AdapterError`,
//! `DiscoveryError`, `StoreError`); this type unifies them at the crate
//! boundary. Adapter and discovery failures are normally absorbed into phase
//! outcomes by the orchestrator and only surface here from entry points that
//! cannot produce a session at all.

use thiserror::Error;

/// Unified error type for all sentinel-scan operations.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Tool adapter failure that escaped phase handling.
    #[error("Adapter error: {0}")]
    Adapter(#[from] crate::adapter::AdapterError),

    /// Resource discovery failure.
    #[error("Discovery error: {0}")]
    Discovery(#[from] crate::discovery::DiscoveryError),

    /// Session persistence failure.
    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Get the root cause of the error chain.
    pub fn root_cause(&self) -> &dyn std::error::Error {
        let mut current: &dyn std::error::Error = self;
        while let Some(source) = current.source() {
            current = source;
        }
        current
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ScanError::config("missing GITHUB_TOKEN");
        assert!(err.to_string().contains("missing GITHUB_TOKEN"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ScanError = io_err.into();
        assert!(matches!(err, ScanError::Io(_)));
    }

    #[test]
    fn test_root_cause() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "root cause");
        let err: ScanError = io_err.into();
        assert!(err.root_cause().to_string().contains("root cause"));
    }
}
