//! The unit of work the runner schedules.

use async_trait::async_trait;

use treehub_core::result::AppResult;

/// Summary of one task pass, logged by the runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskReport {
    /// Items the pass finished.
    pub processed: usize,
    /// Items the pass gave up on for now.
    pub failed: usize,
}

impl TaskReport {
    /// Whether the pass touched nothing.
    pub fn is_idle(&self) -> bool {
        self.processed == 0 && self.failed == 0
    }
}

/// A task run once per worker tick.
#[async_trait]
pub trait PeriodicTask: Send + Sync + std::fmt::Debug {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Perform one pass.
    async fn run_once(&self) -> AppResult<TaskReport>;
}
