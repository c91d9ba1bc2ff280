//! In-memory key-value store.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

use crate::kv::{KvError, KvStore, Namespace};

/// In-memory key-value store.
///
/// Each namespace is a `BTreeMap` so that `get_all` returns keys in order.
/// Nothing is persisted; all data is lost when dropped.
#[derive(Default)]
pub struct MemoryKvStore {
    namespaces: Mutex<HashMap<Namespace, BTreeMap<String, Vec<u8>>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn put(&self, ns: Namespace, key: &str, value: &[u8]) -> Result<(), KvError> {
        self.namespaces
            .lock()
            .entry(ns)
            .or_default()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, ns: Namespace, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self
            .namespaces
            .lock()
            .get(&ns)
            .and_then(|entries| entries.get(key).cloned()))
    }

    fn get_all(&self, ns: Namespace) -> Result<Vec<(String, Vec<u8>)>, KvError> {
        Ok(self
            .namespaces
            .lock()
            .get(&ns)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn delete(&self, ns: Namespace, key: &str) -> Result<bool, KvError> {
        Ok(self
            .namespaces
            .lock()
            .get_mut(&ns)
            .is_some_and(|entries| entries.remove(key).is_some()))
    }
}
