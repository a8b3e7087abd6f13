//! SQLite-backed key-value store.
//!
//! A single `kv` table holds the persisted records. rusqlite is blocking, so
//! every call runs on tokio's blocking pool.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{check_key, KeyValueStore};
use crate::error::StorageError;

/// SQLite database holding the `kv` table.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StorageError::Unavailable("connection mutex poisoned".to_string()))?;
            f(&*conn)
        })
        .await
        .map_err(|e| StorageError::Unavailable(e.to_string()))?
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        check_key(key)?;
        let key = key.to_string();
        self.with_conn(move |conn| {
            let found = conn
                .query_row("SELECT value FROM kv WHERE key = ?1", params![&key], |row| {
                    row.get::<_, String>(0)
                })
                .optional();
            found.map_err(|e| StorageError::ReadFailed {
                key,
                message: e.to_string(),
            })
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        check_key(key)?;
        let key = key.to_string();
        let value = value.to_string();
        self.with_conn(move |conn| {
            let written = conn.execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![&key, &value],
            );
            written.map(|_| ()).map_err(|e| StorageError::WriteFailed {
                key,
                message: e.to_string(),
            })
        })
        .await
    }
}
