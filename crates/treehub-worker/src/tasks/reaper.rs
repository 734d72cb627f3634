//! Retries blob deletions that failed when their rows were removed.

use async_trait::async_trait;

use treehub_core::config::WorkerConfig;
use treehub_core::result::AppResult;
use treehub_service::BlobReclaimer;

use crate::task::{PeriodicTask, TaskReport};

/// Drains the pending blob deletion queue in batches.
#[derive(Debug, Clone)]
pub struct BlobReaper {
    reclaimer: BlobReclaimer,
    batch_size: u32,
    max_attempts: u32,
}

impl BlobReaper {
    /// Create a reaper using the worker's batch and attempt limits.
    pub fn new(reclaimer: BlobReclaimer, config: &WorkerConfig) -> Self {
        Self {
            reclaimer,
            batch_size: config.batch_size,
            max_attempts: config.max_attempts,
        }
    }
}

#[async_trait]
impl PeriodicTask for BlobReaper {
    fn name(&self) -> &str {
        "blob_reaper"
    }

    async fn run_once(&self) -> AppResult<TaskReport> {
        let report = self
            .reclaimer
            .drain(self.batch_size, self.max_attempts)
            .await?;
        Ok(TaskReport {
            processed: report.deleted,
            failed: report.failed,
        })
    }
}
