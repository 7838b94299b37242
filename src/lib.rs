//! # CountKV
//!
//! Named, namespaced integer counters with pluggable storage:
//! - Unbounded dynamic store (concurrent hash table per namespace)
//! - Fixed-capacity atomic array store, balanced read/write
//! - Fixed-capacity striped array store, tuned for concurrent writers
//! - Single coordinator thread serializing all operations
//! - Optional periodic sweep clearing every namespace
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Counters / NamespaceCounters                   │
//! │                  (many caller threads)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  call / reply
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Coordinator                              │
//! │        (single actor thread, sweep ticker, events)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  Box<dyn CounterBackend>
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────────────┐
//!   │  Dynamic    │          │   Fixed-Capacity     │
//!   │ (DashMap)   │          │ slots + index + free │
//!   └─────────────┘          └──────────┬───────────┘
//!                                       │
//!                            ┌──────────┴──────────┐
//!                            ▼                     ▼
//!                     ┌─────────────┐      ┌──────────────┐
//!                     │ AtomicSlots │      │ StripedSlots │
//!                     │ (balanced)  │      │ (write-opt)  │
//!                     └─────────────┘      └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use countkv::{Config, Coordinator};
//!
//! let store = Coordinator::start(Config::default()).unwrap();
//! let counters = store.counters();
//!
//! assert_eq!(counters.increment("requests").unwrap(), 1);
//! assert_eq!(counters.namespace("api").increment_by("hits", 10, 100).unwrap(), 110);
//! assert_eq!(counters.get("missing").unwrap(), None);
//!
//! store.stop().unwrap();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod event;

pub mod backend;
pub mod coordinator;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CountError, Result};
pub use config::Config;
pub use backend::{BackendInfo, BackendKind, CasOutcome, CounterBackend, DEFAULT_NAMESPACE};
pub use coordinator::{Coordinator, Counters, NamespaceCounters};
pub use event::{CounterEvent, CounterOp, EventSink};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of CountKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
