//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Blob reaper / background task configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interval in seconds between polls of the pending blob deletion queue.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Maximum number of pending deletions claimed per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Attempts after which a pending deletion is left for manual reconciliation.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_seconds: default_poll_interval(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    30
}

fn default_batch_size() -> u32 {
    100
}

fn default_max_attempts() -> u32 {
    10
}
