use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::Result;

/// Command engine tuning.
///
/// The queues stay unbounded (no backpressure); `max_workers` is the
/// only bound on in-flight commands, and there is no per-command
/// timeout, so a hung command occupies one worker permit indefinitely.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of concurrently executing commands.
    pub max_workers: usize,

    /// Additional attempts after a first retriable failure.
    pub retry_limit: usize,

    /// How often supervisors check their loops for liveness.
    pub supervision_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: 8,
            retry_limit: 3,
            supervision_interval: Duration::from_secs(1),
        }
    }
}

impl EngineConfig {
    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn retry_limit(mut self, retry_limit: usize) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    pub fn supervision_interval(mut self, interval: Duration) -> Self {
        self.supervision_interval = interval;
        self
    }
}

/// One configured interact interface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterfaceConf {
    /// Interface kind; `"console"` (the default) is the only built-in.
    #[serde(default)]
    pub interface_type: Option<String>,

    /// Registry name; defaults to the interface type's name.
    #[serde(default)]
    pub name: Option<String>,

    /// Whether to start this interface's listener.
    #[serde(default)]
    pub start: bool,

    /// Constructor options forwarded to the interface type.
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,
}

/// Interact engine configuration. An empty interface list means the
/// single default interface, started.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractConfig {
    #[serde(default)]
    pub interacts: Vec<InterfaceConf>,
}

impl InteractConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
