//! Command definitions
//!
//! Messages exchanged between [`Counters`](super::Counters) handles and the
//! coordinator thread.

use std::collections::HashMap;

use crossbeam::channel::Sender;

use crate::backend::{BackendInfo, CasOutcome};
use crate::error::Result;

/// A counter operation, namespace already resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Increment {
        namespace: String,
        key: String,
        step: i64,
        default: i64,
    },
    Get {
        namespace: String,
        key: String,
    },
    Set {
        namespace: String,
        key: String,
        value: i64,
    },
    Reset {
        namespace: String,
        key: String,
        initial: i64,
    },
    Delete {
        namespace: String,
        key: String,
    },
    All {
        namespace: String,
    },
    DeleteNamespace {
        namespace: String,
    },
    CompareAndSwap {
        namespace: String,
        key: String,
        expected: i64,
        new_value: i64,
    },
    Info,
    Sweep,
}

impl Command {
    /// Operation name, for logs and reply mismatches
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Command::Increment { .. } => "increment",
            Command::Get { .. } => "get",
            Command::Set { .. } => "set",
            Command::Reset { .. } => "reset",
            Command::Delete { .. } => "delete",
            Command::All { .. } => "all",
            Command::DeleteNamespace { .. } => "delete_namespace",
            Command::CompareAndSwap { .. } => "compare_and_swap",
            Command::Info => "info",
            Command::Sweep => "sweep",
        }
    }
}

/// Result payload of a command
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Reply {
    /// increment / set / reset
    Value(i64),

    /// get
    Maybe(Option<i64>),

    /// delete / delete_namespace / sweep
    Done,

    /// all
    All(HashMap<String, i64>),

    /// compare_and_swap
    Swap(CasOutcome),

    /// info
    Info(BackendInfo),
}

/// What travels through the coordinator mailbox
pub(crate) enum Envelope {
    /// Run a command and send the result back on `reply`
    Call {
        command: Command,
        reply: Sender<Result<Reply>>,
    },

    /// Shut the coordinator down
    Stop,
}
