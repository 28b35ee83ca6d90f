/// Persistence contract for session state.
///
/// The backend is a plain string key-value store. Typed reads go through
/// `Namespaced::load`, which treats anything undecodable as absent so a
/// corrupt entry can never take the session down.
use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{RankError, StoreError};

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-process store; contents are lost with the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// A store plus the prefix every key is written under.
#[derive(Debug)]
pub struct Namespaced<S> {
    namespace: String,
    backend: S,
}

impl<S: KeyValueStore> Namespaced<S> {
    pub fn new(namespace: impl Into<String>, backend: S) -> Self {
        Namespaced {
            namespace: namespace.into(),
            backend,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn into_backend(self) -> S {
        self.backend
    }

    pub fn full_key(&self, key: &str) -> String {
        if self.namespace.is_empty() {
            key.to_string()
        } else {
            format!("{}-{}", self.namespace, key)
        }
    }

    /// Decoded value, `Ok(None)` when absent, or the decode failure.
    pub fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RankError> {
        let full_key = self.full_key(key);
        let Some(raw) = self.backend.get(&full_key) else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| RankError::MalformedPersistedState {
                key: full_key,
                reason: e.to_string(),
            })
    }

    /// Decoded value, falling back to `T::default()` when absent or malformed.
    pub fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.try_load(key) {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                tracing::warn!("{e}; using default");
                T::default()
            }
        }
    }

    pub fn save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let full_key = self.full_key(key);
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: full_key.clone(),
            source,
        })?;
        self.backend.set(&full_key, raw)
    }

    pub fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let full_key = self.full_key(key);
        self.backend.remove(&full_key)
    }
}
