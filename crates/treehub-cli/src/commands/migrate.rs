//! Database migration command.

use treehub_core::config::{AppConfig, DatabaseBackend};
use treehub_core::error::AppError;
use treehub_database::DatabasePool;

use crate::output;

/// Run all pending migrations against the configured database
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    if config.database.backend == DatabaseBackend::Memory {
        output::print_success("Memory backend selected; nothing to migrate.");
        return Ok(());
    }

    println!("Running database migrations...");
    let pool = DatabasePool::connect(&config.database).await?;
    treehub_database::migration::run_migrations(pool.pool()).await?;
    output::print_success("All migrations applied successfully.");
    Ok(())
}
