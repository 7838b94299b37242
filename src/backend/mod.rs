//! Backend Module
//!
//! The storage contract every counter backend implements, plus the backends.
//!
//! ## Backends
//! - [`DynamicStore`]: unbounded, one concurrent table per namespace
//! - [`BalancedStore`]: fixed capacity, one atomic per slot, native CAS
//! - [`WriteOptimizedStore`]: fixed capacity, striped slots for write-heavy
//!   workloads, emulated CAS
//!
//! ## Concurrency
//! All methods take `&self`. Backends are safe to share across threads; the
//! coordinator additionally serializes every call, which is what makes the
//! emulated CAS of the write-optimized store safe.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config::Config;
use crate::error::{CountError, Result};

mod dynamic;
mod fixed;
mod slots;

pub use dynamic::DynamicStore;
pub use fixed::{BalancedStore, FixedStore, WriteOptimizedStore};
pub use slots::{AtomicSlots, SlotArray, StripedSlots};

/// Namespace provisioned by every backend at init
pub const DEFAULT_NAMESPACE: &str = "default";

/// Backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Unbounded concurrent hash table per namespace
    Dynamic,

    /// Fixed-capacity atomic array, balanced read/write latency
    Balanced,

    /// Fixed-capacity striped array, favors concurrent writers
    WriteOptimized,
}

impl BackendKind {
    /// Whether this backend has a per-namespace capacity
    pub fn is_fixed(&self) -> bool {
        !matches!(self, BackendKind::Dynamic)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Dynamic => "dynamic",
            BackendKind::Balanced => "balanced",
            BackendKind::WriteOptimized => "write_optimized",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = CountError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dynamic" => Ok(BackendKind::Dynamic),
            "balanced" => Ok(BackendKind::Balanced),
            "write_optimized" | "write-optimized" => Ok(BackendKind::WriteOptimized),
            other => Err(CountError::Config(format!("unknown backend '{}'", other))),
        }
    }
}

/// Result of a compare-and-swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CasOutcome {
    /// The value matched and now holds the new value
    Swapped(i64),

    /// The value did not match; carries the value observed
    Mismatch(i64),
}

impl CasOutcome {
    pub fn is_swapped(&self) -> bool {
        matches!(self, CasOutcome::Swapped(_))
    }
}

/// Read-only snapshot of a backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendInfo {
    pub kind: BackendKind,

    /// Slots per namespace (`None` for the dynamic store)
    pub capacity: Option<usize>,

    /// Registered namespaces, sorted
    pub active_namespaces: Vec<String>,

    /// Live keys per namespace
    pub counts_by_namespace: BTreeMap<String, usize>,

    /// `allocated_keys / (capacity × active_namespaces)`
    ///
    /// Normalizes by the total namespace count, so it underestimates the fill
    /// of any single namespace when keys are spread unevenly.
    pub utilization: Option<f64>,
}

/// The operation set every counter backend supports
///
/// Callers never need to know which backend is in use: absent keys and
/// namespaces read as `None`/empty, deletes are idempotent, and the only
/// backend-specific failure is [`CountError::CapacityExceeded`].
pub trait CounterBackend: Send + Sync {
    /// Which backend this is
    fn kind(&self) -> BackendKind;

    /// Add `step` to a counter, materializing it with `default` first if the
    /// key is unseen. Returns the post-increment value.
    fn increment(&self, namespace: &str, key: &str, step: i64, default: i64) -> Result<i64>;

    /// Read a counter
    fn get(&self, namespace: &str, key: &str) -> Option<i64>;

    /// Overwrite a counter, materializing it if absent
    fn set(&self, namespace: &str, key: &str, value: i64) -> Result<i64>;

    /// Same as [`set`](CounterBackend::set)
    fn reset(&self, namespace: &str, key: &str, initial: i64) -> Result<i64> {
        self.set(namespace, key, initial)
    }

    /// Remove a counter (idempotent)
    fn delete(&self, namespace: &str, key: &str);

    /// All counters in a namespace
    fn get_all(&self, namespace: &str) -> HashMap<String, i64>;

    /// Remove every counter in a namespace (idempotent)
    fn delete_namespace(&self, namespace: &str);

    /// Replace the value only if it currently equals `expected`.
    /// An absent key compares as `0`.
    fn compare_and_swap(
        &self,
        namespace: &str,
        key: &str,
        expected: i64,
        new_value: i64,
    ) -> Result<CasOutcome>;

    /// Registered namespaces
    fn namespaces(&self) -> Vec<String>;

    /// Read-only introspection
    fn info(&self) -> BackendInfo;
}

/// Build the backend selected by `config`
///
/// Validates the config first; an invalid config never yields a backend.
pub fn init(config: &Config) -> Result<Box<dyn CounterBackend>> {
    config.validate()?;

    let backend: Box<dyn CounterBackend> = match config.backend {
        BackendKind::Dynamic => Box::new(DynamicStore::new()),
        BackendKind::Balanced => Box::new(BalancedStore::new(config.capacity, config.stripes)?),
        BackendKind::WriteOptimized => {
            Box::new(WriteOptimizedStore::new(config.capacity, config.stripes)?)
        }
    };

    Ok(backend)
}
