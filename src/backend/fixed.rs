//! Fixed-Capacity Store
//!
//! Each namespace owns a pre-allocated [`SlotArray`] of `capacity` slots and
//! a key → slot index map. Slots are recycled through a free list.
//!
//! ## Locking
//! Two tiers, per namespace:
//! - **Allocator mutex** (coarse): binding a key to a slot, releasing a slot,
//!   clearing the namespace. Held only for structural changes.
//! - **Slot atomics** (lock-free): arithmetic on a slot already bound to a
//!   key. No lock is taken on the hot increment path.
//!
//! ## Slot lifecycle
//! ```text
//!   unassigned ──first write──► assigned ──delete / clear──► free list
//!        ▲                                                       │
//!        └────────────── (clear resets next_index) ◄─────────────┘
//!                          free list ──next new key (LIFO)──► assigned
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::{CountError, Result};

use super::slots::{AtomicSlots, SlotArray, StripedSlots};
use super::{BackendInfo, BackendKind, CasOutcome, CounterBackend, DEFAULT_NAMESPACE};

/// Fixed-capacity store with one atomic per slot and native CAS
pub type BalancedStore = FixedStore<AtomicSlots>;

/// Fixed-capacity store with striped slots; CAS is emulated
pub type WriteOptimizedStore = FixedStore<StripedSlots>;

// =============================================================================
// Allocator
// =============================================================================

/// Index bookkeeping for one namespace
///
/// Together with the key map this partitions `[1, capacity]`: every index is
/// either bound to a key, on the free list, or `>= next_index`.
#[derive(Debug)]
struct Allocator {
    capacity: usize,
    next_index: usize,
    free: Vec<usize>,
}

impl Allocator {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            next_index: 1,
            free: Vec::new(),
        }
    }

    /// Take a slot index, most recently freed first
    fn allocate(&mut self) -> Option<usize> {
        if let Some(index) = self.free.pop() {
            return Some(index);
        }
        if self.next_index > self.capacity {
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;
        Some(index)
    }

    fn release(&mut self, index: usize) {
        self.free.push(index);
    }

    fn reset(&mut self) {
        self.next_index = 1;
        self.free.clear();
    }
}

// =============================================================================
// Namespace Storage
// =============================================================================

/// Slots, key index and allocator of one namespace
struct Partition<S> {
    slots: S,
    index: DashMap<String, usize>,
    allocator: Mutex<Allocator>,
}

impl<S: SlotArray> Partition<S> {
    fn new(capacity: usize, stripes: usize) -> Self {
        Self {
            slots: S::allocate(capacity, stripes),
            index: DashMap::new(),
            allocator: Mutex::new(Allocator::new(capacity)),
        }
    }

    /// Slot bound to `key`, if any
    #[inline]
    fn lookup(&self, key: &str) -> Option<usize> {
        self.index.get(key).map(|i| *i)
    }

    /// Slot bound to `key`, binding a fresh one initialized to `initial` if
    /// the key is unseen
    ///
    /// Returns `(index, created)`. The initial value is stored before the
    /// binding is published, so a racing first writer either allocates the
    /// key itself or finds it already initialized.
    fn resolve(&self, namespace: &str, key: &str, initial: i64) -> Result<(usize, bool)> {
        if let Some(index) = self.lookup(key) {
            return Ok((index, false));
        }

        let mut allocator = self.allocator.lock();

        // Another writer may have bound the key while we waited for the lock
        if let Some(index) = self.lookup(key) {
            return Ok((index, false));
        }

        let index = match allocator.allocate() {
            Some(index) => index,
            None => {
                tracing::warn!(
                    namespace,
                    key,
                    capacity = allocator.capacity,
                    "slot allocation failed, namespace is full"
                );
                return Err(CountError::CapacityExceeded {
                    namespace: namespace.to_string(),
                    capacity: allocator.capacity,
                });
            }
        };

        self.slots.store(index, initial);
        self.index.insert(key.to_string(), index);
        Ok((index, true))
    }

    /// Unbind `key` and return its slot to the free list
    fn release(&self, key: &str) {
        let mut allocator = self.allocator.lock();
        if let Some((_, index)) = self.index.remove(key) {
            self.slots.store(index, 0);
            allocator.release(index);
        }
    }

    /// Unbind every key and zero every slot
    fn clear(&self) {
        let mut allocator = self.allocator.lock();
        self.slots.zero_all();
        self.index.clear();
        allocator.reset();
    }
}

// =============================================================================
// Store
// =============================================================================

/// Namespace-partitioned fixed-capacity counter store
///
/// The slot layout `S` decides the tuning profile; the allocation algorithm
/// and the observable contract are identical for every layout.
pub struct FixedStore<S> {
    capacity: usize,
    stripes: usize,
    partitions: DashMap<String, Arc<Partition<S>>>,
}

impl<S: SlotArray> FixedStore<S> {
    /// Create a store with `capacity` slots per namespace
    ///
    /// `stripes` is only used by striped layouts. The default namespace is
    /// allocated immediately.
    pub fn new(capacity: usize, stripes: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CountError::Config(
                "fixed-capacity store requires a capacity of at least 1".to_string(),
            ));
        }
        if stripes == 0 && S::KIND == BackendKind::WriteOptimized {
            return Err(CountError::Config(
                "write-optimized store requires at least 1 stripe".to_string(),
            ));
        }

        let store = Self {
            capacity,
            stripes,
            partitions: DashMap::new(),
        };
        store.partition_or_create(DEFAULT_NAMESPACE);
        Ok(store)
    }

    /// Slots per namespace
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn partition(&self, namespace: &str) -> Option<Arc<Partition<S>>> {
        self.partitions.get(namespace).map(|p| Arc::clone(p.value()))
    }

    fn partition_or_create(&self, namespace: &str) -> Arc<Partition<S>> {
        if let Some(partition) = self.partition(namespace) {
            return partition;
        }
        let partition = self
            .partitions
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::new(Partition::new(self.capacity, self.stripes)));
        Arc::clone(partition.value())
    }
}

impl<S: SlotArray> CounterBackend for FixedStore<S> {
    fn kind(&self) -> BackendKind {
        S::KIND
    }

    fn increment(&self, namespace: &str, key: &str, step: i64, default: i64) -> Result<i64> {
        let partition = self.partition_or_create(namespace);
        let (index, _) = partition.resolve(namespace, key, default)?;
        Ok(partition.slots.add(index, step))
    }

    fn get(&self, namespace: &str, key: &str) -> Option<i64> {
        let partition = self.partition(namespace)?;
        let index = partition.lookup(key)?;
        Some(partition.slots.load(index))
    }

    fn set(&self, namespace: &str, key: &str, value: i64) -> Result<i64> {
        let partition = self.partition_or_create(namespace);
        let (index, created) = partition.resolve(namespace, key, value)?;
        if !created {
            partition.slots.store(index, value);
        }
        Ok(value)
    }

    fn delete(&self, namespace: &str, key: &str) {
        if let Some(partition) = self.partition(namespace) {
            partition.release(key);
        }
    }

    fn get_all(&self, namespace: &str) -> HashMap<String, i64> {
        let Some(partition) = self.partition(namespace) else {
            return HashMap::new();
        };
        let all: HashMap<String, i64> = partition
            .index
            .iter()
            .map(|entry| (entry.key().clone(), partition.slots.load(*entry.value())))
            .collect();
        all
    }

    fn delete_namespace(&self, namespace: &str) {
        if let Some(partition) = self.partition(namespace) {
            partition.clear();
        }
    }

    fn compare_and_swap(
        &self,
        namespace: &str,
        key: &str,
        expected: i64,
        new_value: i64,
    ) -> Result<CasOutcome> {
        let bound = self
            .partition(namespace)
            .and_then(|p| p.lookup(key).map(|index| (p, index)));

        if let Some((partition, index)) = bound {
            return Ok(match partition.slots.compare_exchange(index, expected, new_value) {
                Ok(value) => CasOutcome::Swapped(value),
                Err(current) => CasOutcome::Mismatch(current),
            });
        }

        // Absent key compares as 0; only a match allocates a slot
        if expected != 0 {
            return Ok(CasOutcome::Mismatch(0));
        }

        let partition = self.partition_or_create(namespace);
        let (index, created) = partition.resolve(namespace, key, new_value)?;
        if created {
            return Ok(CasOutcome::Swapped(new_value));
        }

        // Lost the race to another first writer: compare against its value
        Ok(match partition.slots.compare_exchange(index, expected, new_value) {
            Ok(value) => CasOutcome::Swapped(value),
            Err(current) => CasOutcome::Mismatch(current),
        })
    }

    fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.partitions.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    fn info(&self) -> BackendInfo {
        let counts_by_namespace: BTreeMap<String, usize> = self
            .partitions
            .iter()
            .map(|e| (e.key().clone(), e.value().index.len()))
            .collect();

        let allocated: usize = counts_by_namespace.values().sum();
        let total_slots = self.capacity * counts_by_namespace.len();
        let utilization = if total_slots == 0 {
            0.0
        } else {
            allocated as f64 / total_slots as f64
        };

        BackendInfo {
            kind: S::KIND,
            capacity: Some(self.capacity),
            active_namespaces: counts_by_namespace.keys().cloned().collect(),
            counts_by_namespace,
            utilization: Some(utilization),
        }
    }
}
