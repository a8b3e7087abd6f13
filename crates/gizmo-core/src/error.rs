//! Core error types for gizmo-core.
//!
//! Persistence failures are recoverable everywhere in this crate: the engine
//! keeps its in-memory state authoritative and only durability degrades. The
//! types here exist so callers and logs can tell those failures apart.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for gizmo-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage collaborator errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A persisted record could not be decoded
    #[error("Could not decode record '{key}': {message}")]
    Decode { key: String, message: String },

    /// Rejected spend or malformed amount
    #[error("Spend rejected: {0}")]
    Spend(#[from] SpendError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors reported by a [`KeyValueStore`](crate::storage::KeyValueStore).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Failed to read '{key}': {message}")]
    ReadFailed { key: String, message: String },

    #[error("Failed to write '{key}': {message}")]
    WriteFailed { key: String, message: String },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Backend could not be reached at all (closed database, worker panic).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Why a spend did not happen. Neither case mutates the balance.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendError {
    #[error("insufficient balance: requested {requested}, available {balance}")]
    InsufficientBalance { balance: u64, requested: u64 },

    #[error("spend amount must be greater than zero")]
    InvalidAmount,
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg)
                if code.code == rusqlite::ErrorCode::DatabaseLocked
                    || code.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                StorageError::Unavailable("database is locked".to_string())
            }
            _ => StorageError::Unavailable(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spend_error_messages_name_amounts() {
        let err = SpendError::InsufficientBalance {
            balance: 5,
            requested: 10,
        };
        assert_eq!(
            err.to_string(),
            "insufficient balance: requested 10, available 5"
        );
    }

    #[test]
    fn storage_error_converts_into_core_error() {
        let err: CoreError = StorageError::InvalidKey(String::new()).into();
        assert!(matches!(err, CoreError::Storage(StorageError::InvalidKey(_))));
    }
}
