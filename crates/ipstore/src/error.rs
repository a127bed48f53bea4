//! Error types for ipstore.
//!
//! Missing records and missing keys are not errors; they are reported as
//! [`crate::store::Lookup`] variants. Cleanup failures during retention are
//! not errors either; they are collected in a [`crate::storage::PruneReport`].

use std::path::PathBuf;

/// Store error types covering all fallible operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create record {}: {source}", path.display())]
    RecordCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to lock record {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` for configuration problems detected at construction.
    pub fn is_configuration(&self) -> bool {
        matches!(self, StoreError::Configuration(_))
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, StoreError>;
