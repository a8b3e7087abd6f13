//! In-memory key-value store.
//!
//! Used for ephemeral sessions and as the test double for persistence: reads
//! and writes can be made to fail on demand to exercise the degraded paths.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{check_key, KeyValueStore};
use crate::error::StorageError;

#[derive(Debug, Default)]
struct Faults {
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

/// Cheap to clone; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<HashMap<String, String>>>,
    faults: Arc<Faults>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.faults.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.faults.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current value without going through fault injection.
    pub async fn peek(&self, key: &str) -> Option<String> {
        self.data.read().await.get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        check_key(key)?;
        if self.faults.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::ReadFailed {
                key: key.to_string(),
                message: "injected read failure".to_string(),
            });
        }
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        check_key(key)?;
        if self.faults.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed {
                key: key.to_string(),
                message: "injected write failure".to_string(),
            });
        }
        self.data
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_set_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn injected_write_failure_keeps_old_value() {
        let store = MemoryStore::new();
        store.set("k", "old").await.unwrap();
        store.fail_writes(true);
        assert!(matches!(
            store.set("k", "new").await,
            Err(StorageError::WriteFailed { .. })
        ));
        assert_eq!(store.peek("k").await.as_deref(), Some("old"));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn injected_read_failure() {
        let store = MemoryStore::new();
        store.fail_reads(true);
        assert!(matches!(
            store.get("k").await,
            Err(StorageError::ReadFailed { .. })
        ));
    }

    #[tokio::test]
    async fn empty_key_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.set("", "v").await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
