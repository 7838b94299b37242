//! Error types for CountKV
//!
//! Provides a unified error type for all counter operations.
//!
//! A failed compare-and-swap precondition is *not* an error: it is reported as
//! [`CasOutcome::Mismatch`](crate::backend::CasOutcome::Mismatch). Likewise an
//! absent key or namespace is reported as `None`, never as an error.

use thiserror::Error;

/// Result type alias using CountError
pub type Result<T> = std::result::Result<T, CountError>;

/// Unified error type for CountKV operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CountError {
    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("capacity exceeded: namespace '{namespace}' already holds {capacity} keys")]
    CapacityExceeded { namespace: String, capacity: usize },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Coordinator Errors
    // -------------------------------------------------------------------------
    #[error("Failed to start coordinator: {0}")]
    Startup(String),

    #[error("Coordinator is not running")]
    Stopped,

    #[error("Coordinator thread panicked")]
    Panicked,

    #[error("Unexpected reply from coordinator for {0}")]
    UnexpectedReply(&'static str),
}
