//! In-memory store backed by a concurrent map.

use dashmap::DashMap;

use crate::storage::{KeyValueStore, StoreError};

/// Thread-safe in-memory [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.get(key).map(|r| r.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key);
        Ok(())
    }
}
