//! Coordinator Module
//!
//! The single owner of a counter backend.
//!
//! ## Responsibilities
//! - Build the configured backend once at startup (fail fast on bad config)
//! - Run every counter operation on one thread, in arrival order
//! - Report successful mutations to the event sink
//! - Clear all namespaces on the optional sweep cadence
//!
//! ## Concurrency Model: Single Actor
//!
//! ```text
//!   Counters ──┐
//!   Counters ──┼──► mailbox (unbounded) ──► coordinator thread ──► backend
//!   Counters ──┘        ▲                        │    ▲
//!                       └──── one-shot reply ◄───┘    └── sweep ticker
//! ```
//!
//! Callers block until their reply arrives, so each caller sees its own
//! operations in order. Structural backend changes (namespace creation, slot
//! allocation) are serialized by construction.

mod command;
mod handle;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, select, Receiver};

use crate::backend::{self, CounterBackend};
use crate::config::Config;
use crate::error::{CountError, Result};
use crate::event::{CounterEvent, CounterOp, EventSink, TracingSink};

use command::{Command, Envelope, Reply};

pub use handle::{Counters, NamespaceCounters};

/// A running counter store
///
/// Owns the coordinator thread. Hand out [`Counters`] handles with
/// [`counters`](Coordinator::counters); they stay valid until the coordinator
/// stops, after which every call returns [`CountError::Stopped`].
pub struct Coordinator {
    counters: Counters,
    worker: Option<JoinHandle<()>>,
    name: Option<String>,
}

impl Coordinator {
    /// Start a coordinator that logs events through `tracing`
    pub fn start(config: Config) -> Result<Self> {
        Self::start_with_sink(config, Arc::new(TracingSink))
    }

    /// Start a coordinator reporting events to `sink`
    ///
    /// Startup:
    /// 1. Validate config and build the backend (errors are returned, no
    ///    thread is spawned)
    /// 2. Spawn the coordinator thread
    /// 3. Schedule the sweep ticker, if configured
    pub fn start_with_sink(config: Config, sink: Arc<dyn EventSink>) -> Result<Self> {
        // Step 1: Build backend
        let backend = backend::init(&config)?;

        // Step 2: Spawn the actor
        let (mailbox, inbox) = channel::unbounded();
        let thread_name = match &config.name {
            Some(name) => format!("countkv-{}", name),
            None => "countkv".to_string(),
        };

        let actor = Actor {
            backend,
            sink,
            instance: config.name.clone(),
        };
        let sweep_interval = config.sweep_interval;

        let worker = thread::Builder::new()
            .name(thread_name)
            .spawn(move || actor.run(inbox, sweep_interval))
            .map_err(|e| CountError::Startup(e.to_string()))?;

        tracing::info!(
            instance = config.name.as_deref().unwrap_or("-"),
            backend = %config.backend,
            sweep_interval_ms = sweep_interval.map(|d| d.as_millis() as u64),
            "coordinator started"
        );

        Ok(Self {
            counters: Counters::new(mailbox),
            worker: Some(worker),
            name: config.name,
        })
    }

    /// A handle for issuing counter operations
    pub fn counters(&self) -> Counters {
        self.counters.clone()
    }

    /// Instance name, if configured
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Stop the coordinator and wait for its thread to exit
    ///
    /// Operations already queued ahead of the stop are still answered.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        // A send error means the thread is already gone; join reports why
        let _ = self.counters.mailbox().send(Envelope::Stop);
        worker.join().map_err(|_| CountError::Panicked)?;

        tracing::info!(
            instance = self.name.as_deref().unwrap_or("-"),
            "coordinator stopped"
        );
        Ok(())
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!("Coordinator shutdown failed: {}", e);
        }
    }
}

// =============================================================================
// Actor
// =============================================================================

/// State owned by the coordinator thread
struct Actor {
    backend: Box<dyn CounterBackend>,
    sink: Arc<dyn EventSink>,
    instance: Option<String>,
}

impl Actor {
    /// Serve the mailbox until stopped
    ///
    /// The sweep ticker fires on a fixed cadence; a slow sweep does not push
    /// later ticks back.
    fn run(self, inbox: Receiver<Envelope>, sweep_interval: Option<Duration>) {
        let span = tracing::debug_span!(
            "coordinator",
            instance = self.instance.as_deref().unwrap_or("-")
        );
        let _enter = span.enter();

        let ticker = match sweep_interval {
            Some(interval) => channel::tick(interval),
            None => channel::never(),
        };

        loop {
            select! {
                recv(inbox) -> envelope => match envelope {
                    Ok(Envelope::Call { command, reply }) => {
                        tracing::trace!(op = command.name(), "executing command");
                        let result = self.execute(command);
                        // Caller may have given up waiting
                        let _ = reply.send(result);
                    }
                    Ok(Envelope::Stop) | Err(_) => break,
                },
                recv(ticker) -> _ => self.sweep(),
            }
        }
    }

    /// Execute a command against the backend
    fn execute(&self, command: Command) -> Result<Reply> {
        match command {
            Command::Increment {
                namespace,
                key,
                step,
                default,
            } => {
                let value = self.backend.increment(&namespace, &key, step, default)?;
                self.emit(namespace, Some(key), CounterOp::Increment { step, value });
                Ok(Reply::Value(value))
            }
            Command::Get { namespace, key } => Ok(Reply::Maybe(self.backend.get(&namespace, &key))),
            Command::Set {
                namespace,
                key,
                value,
            } => {
                let value = self.backend.set(&namespace, &key, value)?;
                self.emit(namespace, Some(key), CounterOp::Set { value });
                Ok(Reply::Value(value))
            }
            Command::Reset {
                namespace,
                key,
                initial,
            } => {
                let value = self.backend.reset(&namespace, &key, initial)?;
                self.emit(namespace, Some(key), CounterOp::Reset { value });
                Ok(Reply::Value(value))
            }
            Command::Delete { namespace, key } => {
                self.backend.delete(&namespace, &key);
                self.emit(namespace, Some(key), CounterOp::Delete);
                Ok(Reply::Done)
            }
            Command::All { namespace } => Ok(Reply::All(self.backend.get_all(&namespace))),
            Command::DeleteNamespace { namespace } => {
                self.backend.delete_namespace(&namespace);
                self.emit(namespace, None, CounterOp::DeleteNamespace);
                Ok(Reply::Done)
            }
            Command::CompareAndSwap {
                namespace,
                key,
                expected,
                new_value,
            } => {
                let outcome =
                    self.backend
                        .compare_and_swap(&namespace, &key, expected, new_value)?;
                if outcome.is_swapped() {
                    self.emit(
                        namespace,
                        Some(key),
                        CounterOp::CompareAndSwap {
                            expected,
                            value: new_value,
                        },
                    );
                }
                Ok(Reply::Swap(outcome))
            }
            Command::Info => Ok(Reply::Info(self.backend.info())),
            Command::Sweep => {
                self.sweep();
                Ok(Reply::Done)
            }
        }
    }

    /// Clear every namespace
    fn sweep(&self) {
        let namespaces = self.backend.namespaces();
        for namespace in &namespaces {
            self.backend.delete_namespace(namespace);
        }

        tracing::debug!(namespaces = namespaces.len(), "sweep cleared all namespaces");
        self.emit(
            "*".to_string(),
            None,
            CounterOp::Sweep {
                namespaces: namespaces.len(),
            },
        );
    }

    fn emit(&self, namespace: String, key: Option<String>, op: CounterOp) {
        self.sink.emit(&CounterEvent {
            instance: self.instance.clone(),
            namespace,
            key,
            op,
        });
    }
}
