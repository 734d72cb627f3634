//! Shared test helpers for integration tests.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use treehub_core::config::{DatabaseConfig, TreeConfig};
use treehub_core::traits::BlobStore;
use treehub_database::{DatabasePool, PgTreeStore, TreeStore};
use treehub_entity::Directory;
use treehub_service::TreeServices;
use treehub_storage::{MemoryBlobStore, UrlSigner};

/// Tests share one database, so they run one at a time.
static DB_LOCK: Mutex<()> = Mutex::const_new(());

/// Test application context
pub struct TestApp {
    /// Store under test
    pub store: Arc<PgTreeStore>,
    /// Services wired over the store
    pub services: TreeServices,
    /// Seeded root directory
    pub root: Directory,
    _guard: MutexGuard<'static, ()>,
}

impl TestApp {
    /// Connect, migrate, wipe every table and seed the root. `None` when no
    /// test database is configured.
    pub async fn new() -> Option<Self> {
        let url = std::env::var("TREEHUB_TEST_DATABASE_URL").ok()?;
        let guard = DB_LOCK.lock().await;

        let config = DatabaseConfig {
            url,
            max_connections: 5,
            min_connections: 1,
            ..DatabaseConfig::default()
        };
        let pool = DatabasePool::connect(&config)
            .await
            .expect("Failed to connect to test database");
        treehub_database::migration::run_migrations(pool.pool())
            .await
            .expect("Failed to run migrations");

        Self::clean_database(pool.pool()).await;

        let store = Arc::new(PgTreeStore::new(pool.into_pool()));
        let blobs = Arc::new(MemoryBlobStore::new("memory://", UrlSigner::new("test", 60)));
        let services = TreeServices::new(
            store.clone() as Arc<dyn TreeStore>,
            blobs as Arc<dyn BlobStore>,
            &TreeConfig::default(),
        );
        let root = services
            .directories
            .ensure_root()
            .await
            .expect("Failed to seed root");

        Some(Self {
            store,
            services,
            root,
            _guard: guard,
        })
    }

    async fn clean_database(pool: &sqlx::PgPool) {
        sqlx::query(
            "TRUNCATE pending_blob_deletions, file_versions, files, directories RESTART IDENTITY CASCADE",
        )
        .execute(pool)
        .await
        .expect("Failed to clean database");
    }

    /// Create a directory through the service layer.
    pub async fn mkdir(&self, name: &str, parent: &Directory) -> Directory {
        self.services
            .directories
            .create_directory(name, parent.id)
            .await
            .expect("Failed to create directory")
    }
}
