//! Subtree count and size aggregates.

use std::sync::Arc;

use uuid::Uuid;

use treehub_core::result::AppResult;
use treehub_database::TreeStore;

/// Counts and sizes over a directory's full subtree.
#[derive(Debug, Clone)]
pub struct AggregateService {
    store: Arc<dyn TreeStore>,
}

impl AggregateService {
    /// Creates a new aggregate service.
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        Self { store }
    }

    /// Number of files plus directories at any depth below `id`.
    pub async fn count_directory_children(&self, id: Uuid) -> AppResult<u64> {
        self.store.count_descendants(id).await
    }

    /// Sum of the sizes of every version, superseded ones included, of
    /// every file below `id`. `None` when there are no versions.
    pub async fn get_directory_size(&self, id: Uuid) -> AppResult<Option<i64>> {
        self.store.sum_version_sizes(id).await
    }

    /// Sum of the sizes of only the latest version of each file below
    /// `id`. `None` when there are no versions.
    pub async fn get_directory_current_size(&self, id: Uuid) -> AppResult<Option<i64>> {
        self.store.sum_current_version_sizes(id).await
    }
}
