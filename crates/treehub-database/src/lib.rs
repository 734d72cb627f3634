//! # treehub-database
//!
//! The [`TreeStore`] contract the tree engine is written against, plus two
//! implementations: [`PgTreeStore`] on PostgreSQL (ancestor chains stored as
//! `UUID[]` and queried with the `@>` containment operator) and
//! [`MemoryTreeStore`] for tests and single-process use.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod postgres;
pub mod store;

use std::sync::Arc;

use treehub_core::config::{DatabaseBackend, DatabaseConfig};
use treehub_core::result::AppResult;

pub use connection::DatabasePool;
pub use memory::MemoryTreeStore;
pub use postgres::PgTreeStore;
pub use store::{AncestorRewrite, MoveBatch, NodeKind, SubtreeDeletion, TreeStore};

/// Open the store selected by configuration, running migrations for PostgreSQL.
pub async fn open_store(config: &DatabaseConfig) -> AppResult<Arc<dyn TreeStore>> {
    match config.backend {
        DatabaseBackend::Postgres => {
            let pool = DatabasePool::connect(config).await?;
            migration::run_migrations(pool.pool()).await?;
            Ok(Arc::new(PgTreeStore::new(pool.into_pool())))
        }
        DatabaseBackend::Memory => {
            tracing::warn!("Using in-memory tree store; state is lost on exit");
            Ok(Arc::new(MemoryTreeStore::new()))
        }
    }
}
