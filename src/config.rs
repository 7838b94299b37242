//! Configuration for CountKV
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::backend::BackendKind;
use crate::error::{CountError, Result};

/// Main configuration for a counter store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Backend Configuration
    // -------------------------------------------------------------------------
    /// Which storage backend the coordinator owns (resolved once at startup)
    pub backend: BackendKind,

    /// Slots per namespace for fixed-capacity backends (ignored by `Dynamic`)
    pub capacity: usize,

    /// Stripes per slot array for the write-optimized backend
    pub stripes: usize,

    // -------------------------------------------------------------------------
    // Coordinator Configuration
    // -------------------------------------------------------------------------
    /// Clear every namespace on this cadence, if set
    pub sweep_interval: Option<Duration>,

    /// Instance name, used to tell concurrently running stores apart in
    /// thread names, logs and events
    pub name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Dynamic,
            capacity: 10_000,
            stripes: 8,
            sweep_interval: None,
            name: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the options the selected backend depends on
    pub fn validate(&self) -> Result<()> {
        if self.backend.is_fixed() && self.capacity == 0 {
            return Err(CountError::Config(format!(
                "{} backend requires a capacity of at least 1",
                self.backend
            )));
        }
        if self.backend == BackendKind::WriteOptimized && self.stripes == 0 {
            return Err(CountError::Config(
                "write-optimized backend requires at least 1 stripe".to_string(),
            ));
        }
        if self.sweep_interval == Some(Duration::ZERO) {
            return Err(CountError::Config(
                "sweep interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Select the storage backend
    pub fn backend(mut self, kind: BackendKind) -> Self {
        self.config.backend = kind;
        self
    }

    /// Set the per-namespace capacity of fixed-capacity backends
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Set the stripe count of the write-optimized backend
    pub fn stripes(mut self, stripes: usize) -> Self {
        self.config.stripes = stripes;
        self
    }

    /// Enable the periodic sweep
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = Some(interval);
        self
    }

    /// Set the instance name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
