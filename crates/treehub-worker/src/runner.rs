//! Worker runner: ticks every registered task until cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use treehub_core::config::WorkerConfig;

use crate::task::PeriodicTask;

/// Runs periodic tasks on the configured poll interval.
#[derive(Debug)]
pub struct WorkerRunner {
    tasks: Vec<Arc<dyn PeriodicTask>>,
    poll_interval: Duration,
}

impl WorkerRunner {
    /// Create a runner with no tasks.
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            tasks: Vec::new(),
            poll_interval: Duration::from_secs(config.poll_interval_seconds.max(1)),
        }
    }

    /// Add a task to every tick.
    pub fn register(mut self, task: Arc<dyn PeriodicTask>) -> Self {
        info!(task = task.name(), "Registered periodic task");
        self.tasks.push(task);
        self
    }

    /// Run one pass of every task. Failures are logged, not propagated, so
    /// one broken task does not starve the others.
    pub async fn tick(&self) {
        for task in &self.tasks {
            match task.run_once().await {
                Ok(report) if report.is_idle() => {
                    debug!(task = task.name(), "Nothing to do");
                }
                Ok(report) => {
                    info!(
                        task = task.name(),
                        processed = report.processed,
                        failed = report.failed,
                        "Task pass complete"
                    );
                }
                Err(e) => {
                    error!(task = task.name(), error = %e, "Task pass failed");
                }
            }
        }
    }

    /// Tick until `cancel` flips to `true`.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            tasks = self.tasks.len(),
            poll_interval_secs = self.poll_interval.as_secs(),
            "Worker started"
        );

        let mut interval = time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        info!("Worker received shutdown signal");
                        break;
                    }
                }
                _ = interval.tick() => self.tick().await,
            }
        }

        info!("Worker shut down complete");
    }
}
