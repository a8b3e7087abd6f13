mod config;
pub mod database;
pub mod memory;

pub use config::{ActivityConfig, Config, LoggingConfig, PersistenceConfig, StorageConfig};
pub use database::SqliteStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::{ConfigError, StorageError};

/// Durable string-keyed text storage.
///
/// No multi-key transactions: callers must tolerate keys being written
/// independently and a crash landing between two writes.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Returns the data directory.
///
/// `GIZMO_DATA_DIR` wins when set. Otherwise `~/.config/gizmo[-dev]/`,
/// with `GIZMO_ENV=dev` selecting the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("GIZMO_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("GIZMO_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("gizmo-dev")
            } else {
                base_dir.join("gizmo")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::LoadFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

fn check_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key cannot be empty".to_string()));
    }
    Ok(())
}
