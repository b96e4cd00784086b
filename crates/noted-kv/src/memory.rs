use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{KvError, KvResult};
use crate::traits::KvStore;

/// In-memory, `BTreeMap`-based key-value partition.
///
/// Intended for tests and embedding. Values are reference-counted
/// [`Bytes`], so reads are cheap clones. Data is lost when the store is
/// dropped.
pub struct InMemoryKv {
    entries: RwLock<BTreeMap<String, Bytes>>,
}

impl InMemoryKv {
    /// Create a new empty partition.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if the partition is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes across all stored values.
    pub fn total_bytes(&self) -> u64 {
        self.read()
            .map(|m| m.values().map(|v| v.len() as u64).sum())
            .unwrap_or(0)
    }

    fn read(&self) -> KvResult<RwLockReadGuard<'_, BTreeMap<String, Bytes>>> {
        self.entries
            .read()
            .map_err(|e| KvError::Poisoned(e.to_string()))
    }

    fn write(&self) -> KvResult<RwLockWriteGuard<'_, BTreeMap<String, Bytes>>> {
        self.entries
            .write()
            .map_err(|e| KvError::Poisoned(e.to_string()))
    }
}

impl Default for InMemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for InMemoryKv {
    async fn get(&self, key: &str) -> KvResult<Option<Bytes>> {
        Ok(self.read()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Bytes) -> KvResult<()> {
        self.write()?.insert(key.to_string(), value);
        Ok(())
    }

    async fn add(&self, key: &str, value: Bytes) -> KvResult<()> {
        let mut map = self.write()?;
        if map.contains_key(key) {
            return Err(KvError::AlreadyExists(key.to_string()));
        }
        map.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> KvResult<bool> {
        Ok(self.write()?.remove(key).is_some())
    }

    async fn clear(&self) -> KvResult<()> {
        self.write()?.clear();
        Ok(())
    }

    async fn keys(&self) -> KvResult<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    async fn contains(&self, key: &str) -> KvResult<bool> {
        Ok(self.read()?.contains_key(key))
    }
}

impl std::fmt::Debug for InMemoryKv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKv")
            .field("key_count", &self.len())
            .finish()
    }
}
