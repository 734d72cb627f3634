//! Wiring of a complete service set.

use std::sync::Arc;

use treehub_core::config::TreeConfig;
use treehub_core::traits::BlobStore;
use treehub_database::TreeStore;

use crate::cleanup::BlobReclaimer;
use crate::content::{AggregateService, ContentService};
use crate::directory::{DirectoryService, SubtreeLocks};
use crate::file::{FileService, VersionService};

/// Every service over one store, one blob store and one lock table.
#[derive(Debug, Clone)]
pub struct TreeServices {
    /// Directory maintenance.
    pub directories: DirectoryService,
    /// File rows.
    pub files: FileService,
    /// File versions and downloads.
    pub versions: VersionService,
    /// Subtree listings.
    pub contents: ContentService,
    /// Subtree counts and sizes.
    pub aggregates: AggregateService,
    /// Blob cleanup.
    pub reclaimer: BlobReclaimer,
}

impl TreeServices {
    /// Build the service set.
    pub fn new(store: Arc<dyn TreeStore>, blobs: Arc<dyn BlobStore>, config: &TreeConfig) -> Self {
        let locks = SubtreeLocks::new();
        let reclaimer = BlobReclaimer::new(Arc::clone(&store), Arc::clone(&blobs));

        Self {
            directories: DirectoryService::new(
                Arc::clone(&store),
                locks.clone(),
                reclaimer.clone(),
                config.clone(),
            ),
            files: FileService::new(
                Arc::clone(&store),
                Arc::clone(&blobs),
                locks.clone(),
                reclaimer.clone(),
            ),
            versions: VersionService::new(Arc::clone(&store), blobs, locks),
            contents: ContentService::new(Arc::clone(&store), config),
            aggregates: AggregateService::new(store),
            reclaimer,
        }
    }
}
