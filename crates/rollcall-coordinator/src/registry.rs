//! Typed, write-once keyed store.

use parking_lot::RwLock;
use rollcall_core::{Result, RollcallError};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Concurrent map whose entries are written once and read many times.
///
/// Peers and workers each get their own instance keyed by their own id type,
/// so an entry's kind is known statically.
#[derive(Debug)]
pub struct Registry<K, V> {
    name: &'static str,
    entries: RwLock<BTreeMap<K, V>>,
}

impl<K, V> Registry<K, V>
where
    K: Ord + Copy + Display,
    V: Clone,
{
    /// Create an empty registry
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Store `value` under `key`; a key can only be written once.
    pub fn insert_new(&self, key: K, value: V) -> Result<()> {
        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            return Err(RollcallError::invalid(format!(
                "{} registry already holds {key}",
                self.name
            )));
        }
        entries.insert(key, value);
        Ok(())
    }

    /// Entry for `key`, if registered.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.read().get(key).cloned()
    }

    /// All entries in ascending key order.
    pub fn snapshot(&self) -> Vec<V> {
        self.entries.read().values().cloned().collect()
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing has registered yet.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
