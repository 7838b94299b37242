//! Dynamic Store
//!
//! Unbounded backend: one sharded concurrent table per namespace.
//!
//! Every single-key operation runs under the DashMap shard lock of that key,
//! so increments, sets and compare-and-swap are atomic without any help from
//! the coordinator.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::Result;

use super::{BackendInfo, BackendKind, CasOutcome, CounterBackend, DEFAULT_NAMESPACE};

type Table = DashMap<String, i64>;

/// Unbounded counter store
pub struct DynamicStore {
    /// Namespace → counter table, created lazily on first write
    namespaces: DashMap<String, Arc<Table>>,
}

impl DynamicStore {
    /// Create a store with the default namespace provisioned
    pub fn new() -> Self {
        let namespaces = DashMap::new();
        namespaces.insert(DEFAULT_NAMESPACE.to_string(), Arc::new(Table::new()));
        Self { namespaces }
    }

    /// Table for a namespace, if it exists
    ///
    /// Clones the `Arc` out so the namespace shard lock is released before the
    /// caller touches the table.
    fn table(&self, namespace: &str) -> Option<Arc<Table>> {
        self.namespaces.get(namespace).map(|t| Arc::clone(t.value()))
    }

    /// Table for a namespace, creating it on first reference
    fn table_or_create(&self, namespace: &str) -> Arc<Table> {
        if let Some(table) = self.table(namespace) {
            return table;
        }
        let table = self
            .namespaces
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::new(Table::new()));
        Arc::clone(table.value())
    }
}

impl Default for DynamicStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterBackend for DynamicStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Dynamic
    }

    fn increment(&self, namespace: &str, key: &str, step: i64, default: i64) -> Result<i64> {
        let table = self.table_or_create(namespace);

        // Fast path: existing key, no key allocation
        if let Some(mut value) = table.get_mut(key) {
            *value = value.wrapping_add(step);
            return Ok(*value);
        }

        // The entry holds the shard write lock, so a racing first writer
        // either creates the key or sees it, never both
        let value = table
            .entry(key.to_string())
            .and_modify(|v| *v = v.wrapping_add(step))
            .or_insert(default.wrapping_add(step));
        Ok(*value)
    }

    fn get(&self, namespace: &str, key: &str) -> Option<i64> {
        let table = self.table(namespace)?;
        let value = table.get(key).map(|v| *v);
        value
    }

    fn set(&self, namespace: &str, key: &str, value: i64) -> Result<i64> {
        let table = self.table_or_create(namespace);

        if let Some(mut current) = table.get_mut(key) {
            *current = value;
            return Ok(value);
        }

        table.insert(key.to_string(), value);
        Ok(value)
    }

    fn delete(&self, namespace: &str, key: &str) {
        if let Some(table) = self.table(namespace) {
            table.remove(key);
        }
    }

    fn get_all(&self, namespace: &str) -> HashMap<String, i64> {
        match self.table(namespace) {
            Some(table) => table
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
            None => HashMap::new(),
        }
    }

    fn delete_namespace(&self, namespace: &str) {
        if let Some(table) = self.table(namespace) {
            table.clear();
        }
    }

    fn compare_and_swap(
        &self,
        namespace: &str,
        key: &str,
        expected: i64,
        new_value: i64,
    ) -> Result<CasOutcome> {
        // Absent key compares as 0; a mismatch must not create the namespace
        let table = match self.table(namespace) {
            Some(table) => table,
            None if expected != 0 => return Ok(CasOutcome::Mismatch(0)),
            None => self.table_or_create(namespace),
        };

        let outcome = match table.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let current = *entry.get();
                if current == expected {
                    entry.insert(new_value);
                    CasOutcome::Swapped(new_value)
                } else {
                    CasOutcome::Mismatch(current)
                }
            }
            Entry::Vacant(entry) => {
                if expected == 0 {
                    entry.insert(new_value);
                    CasOutcome::Swapped(new_value)
                } else {
                    CasOutcome::Mismatch(0)
                }
            }
        };

        Ok(outcome)
    }

    fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.namespaces.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    fn info(&self) -> BackendInfo {
        let counts_by_namespace: BTreeMap<String, usize> = self
            .namespaces
            .iter()
            .map(|e| (e.key().clone(), e.value().len()))
            .collect();

        BackendInfo {
            kind: BackendKind::Dynamic,
            capacity: None,
            active_namespaces: counts_by_namespace.keys().cloned().collect(),
            counts_by_namespace,
            utilization: None,
        }
    }
}
