//! Counter handles
//!
//! [`Counters`] works on the default namespace; [`NamespaceCounters`] is the
//! same API scoped to one namespace. Both are cheap to clone and can be moved
//! across threads. Every call blocks until the coordinator answers.

use std::collections::HashMap;

use crossbeam::channel::{self, Sender};

use crate::backend::{BackendInfo, CasOutcome, DEFAULT_NAMESPACE};
use crate::error::{CountError, Result};

use super::command::{Command, Envelope, Reply};

/// Handle to a running coordinator, scoped to the default namespace
#[derive(Clone)]
pub struct Counters {
    mailbox: Sender<Envelope>,
}

impl Counters {
    pub(crate) fn new(mailbox: Sender<Envelope>) -> Self {
        Self { mailbox }
    }

    pub(crate) fn mailbox(&self) -> &Sender<Envelope> {
        &self.mailbox
    }

    /// Send a command and wait for its reply
    fn call(&self, command: Command) -> Result<Reply> {
        let (reply, response) = channel::bounded(1);
        self.mailbox
            .send(Envelope::Call { command, reply })
            .map_err(|_| CountError::Stopped)?;
        response.recv().map_err(|_| CountError::Stopped)?
    }

    /// Handle for another namespace
    pub fn namespace(&self, namespace: impl Into<String>) -> NamespaceCounters {
        NamespaceCounters {
            counters: self.clone(),
            namespace: namespace.into(),
        }
    }

    // =========================================================================
    // Default Namespace
    // =========================================================================

    /// Add 1, starting from 0 for an unseen key
    pub fn increment(&self, key: &str) -> Result<i64> {
        self.increment_in(DEFAULT_NAMESPACE, key, 1, 0)
    }

    /// Add `step`, starting from `default` for an unseen key
    pub fn increment_by(&self, key: &str, step: i64, default: i64) -> Result<i64> {
        self.increment_in(DEFAULT_NAMESPACE, key, step, default)
    }

    pub fn get(&self, key: &str) -> Result<Option<i64>> {
        self.get_in(DEFAULT_NAMESPACE, key)
    }

    pub fn set(&self, key: &str, value: i64) -> Result<i64> {
        self.set_in(DEFAULT_NAMESPACE, key, value)
    }

    pub fn reset(&self, key: &str, initial: i64) -> Result<i64> {
        self.reset_in(DEFAULT_NAMESPACE, key, initial)
    }

    /// Reset to 0
    pub fn reset_to_zero(&self, key: &str) -> Result<i64> {
        self.reset_in(DEFAULT_NAMESPACE, key, 0)
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.delete_in(DEFAULT_NAMESPACE, key)
    }

    /// Every counter in the default namespace
    pub fn all(&self) -> Result<HashMap<String, i64>> {
        self.all_in(DEFAULT_NAMESPACE)
    }

    pub fn compare_and_swap(&self, key: &str, expected: i64, new_value: i64) -> Result<CasOutcome> {
        self.compare_and_swap_in(DEFAULT_NAMESPACE, key, expected, new_value)
    }

    // =========================================================================
    // Store-Wide
    // =========================================================================

    /// Remove every counter in `namespace`
    pub fn delete_namespace(&self, namespace: &str) -> Result<()> {
        match self.call(Command::DeleteNamespace {
            namespace: namespace.to_string(),
        })? {
            Reply::Done => Ok(()),
            _ => Err(CountError::UnexpectedReply("delete_namespace")),
        }
    }

    /// Backend snapshot
    pub fn info(&self) -> Result<BackendInfo> {
        match self.call(Command::Info)? {
            Reply::Info(info) => Ok(info),
            _ => Err(CountError::UnexpectedReply("info")),
        }
    }

    /// Clear every namespace now, as the periodic sweep does
    pub fn sweep(&self) -> Result<()> {
        match self.call(Command::Sweep)? {
            Reply::Done => Ok(()),
            _ => Err(CountError::UnexpectedReply("sweep")),
        }
    }

    // =========================================================================
    // Namespace-Qualified Calls
    // =========================================================================

    fn increment_in(&self, namespace: &str, key: &str, step: i64, default: i64) -> Result<i64> {
        let command = Command::Increment {
            namespace: namespace.to_string(),
            key: key.to_string(),
            step,
            default,
        };
        match self.call(command)? {
            Reply::Value(value) => Ok(value),
            _ => Err(CountError::UnexpectedReply("increment")),
        }
    }

    fn get_in(&self, namespace: &str, key: &str) -> Result<Option<i64>> {
        let command = Command::Get {
            namespace: namespace.to_string(),
            key: key.to_string(),
        };
        match self.call(command)? {
            Reply::Maybe(value) => Ok(value),
            _ => Err(CountError::UnexpectedReply("get")),
        }
    }

    fn set_in(&self, namespace: &str, key: &str, value: i64) -> Result<i64> {
        let command = Command::Set {
            namespace: namespace.to_string(),
            key: key.to_string(),
            value,
        };
        match self.call(command)? {
            Reply::Value(value) => Ok(value),
            _ => Err(CountError::UnexpectedReply("set")),
        }
    }

    fn reset_in(&self, namespace: &str, key: &str, initial: i64) -> Result<i64> {
        let command = Command::Reset {
            namespace: namespace.to_string(),
            key: key.to_string(),
            initial,
        };
        match self.call(command)? {
            Reply::Value(value) => Ok(value),
            _ => Err(CountError::UnexpectedReply("reset")),
        }
    }

    fn delete_in(&self, namespace: &str, key: &str) -> Result<()> {
        let command = Command::Delete {
            namespace: namespace.to_string(),
            key: key.to_string(),
        };
        match self.call(command)? {
            Reply::Done => Ok(()),
            _ => Err(CountError::UnexpectedReply("delete")),
        }
    }

    fn all_in(&self, namespace: &str) -> Result<HashMap<String, i64>> {
        let command = Command::All {
            namespace: namespace.to_string(),
        };
        match self.call(command)? {
            Reply::All(all) => Ok(all),
            _ => Err(CountError::UnexpectedReply("all")),
        }
    }

    fn compare_and_swap_in(
        &self,
        namespace: &str,
        key: &str,
        expected: i64,
        new_value: i64,
    ) -> Result<CasOutcome> {
        let command = Command::CompareAndSwap {
            namespace: namespace.to_string(),
            key: key.to_string(),
            expected,
            new_value,
        };
        match self.call(command)? {
            Reply::Swap(outcome) => Ok(outcome),
            _ => Err(CountError::UnexpectedReply("compare_and_swap")),
        }
    }
}

/// Handle scoped to one namespace
#[derive(Clone)]
pub struct NamespaceCounters {
    counters: Counters,
    namespace: String,
}

impl NamespaceCounters {
    pub fn name(&self) -> &str {
        &self.namespace
    }

    /// Add 1, starting from 0 for an unseen key
    pub fn increment(&self, key: &str) -> Result<i64> {
        self.counters.increment_in(&self.namespace, key, 1, 0)
    }

    /// Add `step`, starting from `default` for an unseen key
    pub fn increment_by(&self, key: &str, step: i64, default: i64) -> Result<i64> {
        self.counters.increment_in(&self.namespace, key, step, default)
    }

    pub fn get(&self, key: &str) -> Result<Option<i64>> {
        self.counters.get_in(&self.namespace, key)
    }

    pub fn set(&self, key: &str, value: i64) -> Result<i64> {
        self.counters.set_in(&self.namespace, key, value)
    }

    pub fn reset(&self, key: &str, initial: i64) -> Result<i64> {
        self.counters.reset_in(&self.namespace, key, initial)
    }

    pub fn reset_to_zero(&self, key: &str) -> Result<i64> {
        self.counters.reset_in(&self.namespace, key, 0)
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.counters.delete_in(&self.namespace, key)
    }

    pub fn all(&self) -> Result<HashMap<String, i64>> {
        self.counters.all_in(&self.namespace)
    }

    pub fn compare_and_swap(&self, key: &str, expected: i64, new_value: i64) -> Result<CasOutcome> {
        self.counters
            .compare_and_swap_in(&self.namespace, key, expected, new_value)
    }

    /// Remove every counter in this namespace
    pub fn clear(&self) -> Result<()> {
        self.counters.delete_namespace(&self.namespace)
    }
}
