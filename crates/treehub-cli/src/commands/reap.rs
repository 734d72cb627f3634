//! One-shot blob reaper pass.

use treehub_core::config::AppConfig;
use treehub_core::error::AppError;
use treehub_worker::{BlobReaper, PeriodicTask};

use crate::output;

/// Drain one batch of the pending blob deletion queue
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    let services = super::open_services(config).await?;
    let reaper = BlobReaper::new(services.reclaimer, &config.worker);
    let report = reaper.run_once().await?;

    output::print_success("Reaper pass complete.");
    output::print_kv("Deleted", &report.processed.to_string());
    output::print_kv("Still queued", &report.failed.to_string());
    Ok(())
}
