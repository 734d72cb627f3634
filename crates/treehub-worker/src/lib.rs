//! Background tasks for TreeHub.
//!
//! This crate provides:
//! - A runner that ticks registered tasks on a fixed interval until cancelled
//! - The blob reaper, which retries object deletions left in the outbox

pub mod runner;
pub mod task;
pub mod tasks;

pub use runner::WorkerRunner;
pub use task::{PeriodicTask, TaskReport};
pub use tasks::BlobReaper;
