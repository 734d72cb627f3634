//! Second phase of deletes: removing blob objects whose rows are gone.
//!
//! Keys reach the outbox in the same transaction that deletes their
//! versions. [`BlobReclaimer::reclaim`] runs right after that commit;
//! [`BlobReclaimer::drain`] is what the background reaper calls for
//! anything left behind.

use std::sync::Arc;

use tracing::{debug, warn};

use treehub_core::result::AppResult;
use treehub_core::traits::BlobStore;
use treehub_database::TreeStore;

/// Outcome of one reclamation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReclaimReport {
    /// Objects removed and acknowledged.
    pub deleted: usize,
    /// Objects whose removal failed; they stay queued.
    pub failed: usize,
}

/// Removes queued blob objects and keeps the outbox in step.
#[derive(Debug, Clone)]
pub struct BlobReclaimer {
    store: Arc<dyn TreeStore>,
    blobs: Arc<dyn BlobStore>,
}

impl BlobReclaimer {
    /// Create a reclaimer over the given stores.
    pub fn new(store: Arc<dyn TreeStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    /// Try to remove `keys` now. Never fails: errors are logged and the
    /// affected keys remain in the outbox.
    pub async fn reclaim(&self, keys: &[String]) -> ReclaimReport {
        let mut removed = Vec::with_capacity(keys.len());
        let mut report = ReclaimReport::default();

        for key in keys {
            match self.blobs.delete_object(key).await {
                Ok(()) => removed.push(key.clone()),
                Err(e) => {
                    report.failed += 1;
                    warn!(key = %key, error = %e, "Blob deletion failed; left for the reaper");
                    if let Err(e) = self.store.record_blob_failure(key, &e.to_string()).await {
                        warn!(key = %key, error = %e, "Failed to record blob deletion failure");
                    }
                }
            }
        }

        match self.store.ack_blob_deletions(&removed).await {
            Ok(_) => report.deleted = removed.len(),
            Err(e) => {
                // Still queued; a repeat delete of a missing object succeeds.
                warn!(count = removed.len(), error = %e, "Failed to acknowledge blob deletions");
            }
        }

        debug!(deleted = report.deleted, failed = report.failed, "Blob reclamation pass");
        report
    }

    /// Retry up to `batch_size` queued deletions that have failed fewer than
    /// `max_attempts` times.
    pub async fn drain(&self, batch_size: u32, max_attempts: u32) -> AppResult<ReclaimReport> {
        let pending = self
            .store
            .pending_blob_deletions(batch_size, max_attempts)
            .await?;
        if pending.is_empty() {
            return Ok(ReclaimReport::default());
        }
        let keys: Vec<String> = pending.into_iter().map(|p| p.key).collect();
        Ok(self.reclaim(&keys).await)
    }
}
