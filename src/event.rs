//! Counter events
//!
//! The coordinator reports every successful mutation to an [`EventSink`].
//! Delivery is the sink's business: the coordinator calls it synchronously on
//! its own thread and ignores what happens next, so sinks should be cheap and
//! must not call back into the store that emitted the event.

use std::fmt;

use serde::Serialize;

/// What happened, with the operation-specific measurements
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CounterOp {
    Increment { step: i64, value: i64 },
    Set { value: i64 },
    Reset { value: i64 },
    Delete,
    DeleteNamespace,
    CompareAndSwap { expected: i64, value: i64 },
    Sweep { namespaces: usize },
}

impl CounterOp {
    pub fn name(&self) -> &'static str {
        match self {
            CounterOp::Increment { .. } => "increment",
            CounterOp::Set { .. } => "set",
            CounterOp::Reset { .. } => "reset",
            CounterOp::Delete => "delete",
            CounterOp::DeleteNamespace => "delete_namespace",
            CounterOp::CompareAndSwap { .. } => "compare_and_swap",
            CounterOp::Sweep { .. } => "sweep",
        }
    }
}

/// A successful mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterEvent {
    /// Name of the emitting store, if it was given one
    pub instance: Option<String>,

    /// Namespace touched (`"*"` for a sweep)
    pub namespace: String,

    /// Key touched, for single-key operations
    pub key: Option<String>,

    #[serde(flatten)]
    pub op: CounterOp,
}

impl fmt::Display for CounterEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op.name(), self.namespace)?;
        if let Some(key) = &self.key {
            write!(f, "/{}", key)?;
        }
        Ok(())
    }
}

/// Receiver of counter events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &CounterEvent);
}

impl<F> EventSink for F
where
    F: Fn(&CounterEvent) + Send + Sync,
{
    fn emit(&self, event: &CounterEvent) {
        self(event)
    }
}

/// Default sink: logs each event at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &CounterEvent) {
        tracing::debug!(
            instance = event.instance.as_deref().unwrap_or("-"),
            op = event.op.name(),
            namespace = %event.namespace,
            key = event.key.as_deref().unwrap_or("-"),
            measurements = ?event.op,
            "counter event"
        );
    }
}

/// Sink that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &CounterEvent) {}
}
