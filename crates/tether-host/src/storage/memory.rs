//! In-memory key-value store for tests and simulation.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use super::{KvError, KvStore};

/// In-memory store backed by a `HashMap`.
///
/// All state lives behind Arc<Mutex<>> so clones share storage. Uses
/// `lock().expect()` which panics if the mutex is poisoned - acceptable
/// for test/simulation code.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    inner: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryKv {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[allow(clippy::expect_used)]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("mutex poisoned").len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemoryKv {
    #[allow(clippy::expect_used)]
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self.inner.lock().expect("mutex poisoned").get(key).cloned())
    }

    #[allow(clippy::expect_used)]
    fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        self.inner.lock().expect("mutex poisoned").insert(key.to_string(), value.to_vec());
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn remove(&self, key: &str) -> Result<(), KvError> {
        self.inner.lock().expect("mutex poisoned").remove(key);
        Ok(())
    }
}
