//! Error types for DocuChain

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Stored blocks exist but cannot be decoded.
    #[error("Storage corrupted: {0}")]
    StorageCorrupted(String),

    #[error("No anchor block: the in-memory chain is empty")]
    NoAnchorBlock,

    #[error("Block index {0} is already stored")]
    DuplicateIndex(u64),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(f64),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::SerializationError(err.to_string())
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::DatabaseError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, LedgerError>;
