//! Raw key-value backends for session state.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::SessionError;

/// A byte-oriented key-value store.
///
/// Implementations only move bytes around; JSON encoding is handled by
/// [`Session`](crate::Session).
pub trait KeyValueStore {
    /// Get the raw bytes stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError>;

    /// Store raw bytes under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), SessionError>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), SessionError>;

    /// Check whether `key` exists.
    fn exists(&self, key: &str) -> Result<bool, SessionError>;

    /// List every key in the store.
    fn keys(&self) -> Result<Vec<String>, SessionError>;
}

/// In-process store backed by a shared map.
///
/// Clones share the same underlying map, so two handles built from one
/// `MemoryStore` observe each other's writes (the way two requests of the
/// same session would).
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Check if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> SessionError {
    SessionError::StoreError("memory store lock poisoned".to_string())
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), SessionError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), SessionError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool, SessionError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.contains_key(key))
    }

    fn keys(&self) -> Result<Vec<String>, SessionError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.keys().cloned().collect())
    }
}

/// Store backed by Spin's Key-Value Store.
#[cfg(target_arch = "wasm32")]
pub struct SpinStore {
    store: spin_sdk::key_value::Store,
}

#[cfg(target_arch = "wasm32")]
impl SpinStore {
    /// Open the default Key-Value store.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let store = SpinStore::open_default()?;
    /// ```
    pub fn open_default() -> Result<Self, SessionError> {
        let store = spin_sdk::key_value::Store::open_default()
            .map_err(|e| SessionError::OpenError(e.to_string()))?;
        Ok(Self { store })
    }

    /// Open a named Key-Value store.
    pub fn open(name: &str) -> Result<Self, SessionError> {
        let store = spin_sdk::key_value::Store::open(name)
            .map_err(|e| SessionError::OpenError(e.to_string()))?;
        Ok(Self { store })
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for SpinStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        self.store
            .get(key)
            .map_err(|e| SessionError::StoreError(e.to_string()))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), SessionError> {
        self.store
            .set(key, value)
            .map_err(|e| SessionError::StoreError(e.to_string()))
    }

    fn delete(&self, key: &str) -> Result<(), SessionError> {
        self.store
            .delete(key)
            .map_err(|e| SessionError::StoreError(e.to_string()))
    }

    fn exists(&self, key: &str) -> Result<bool, SessionError> {
        self.store
            .exists(key)
            .map_err(|e| SessionError::StoreError(e.to_string()))
    }

    fn keys(&self) -> Result<Vec<String>, SessionError> {
        self.store
            .get_keys()
            .map_err(|e| SessionError::StoreError(e.to_string()))
    }
}
