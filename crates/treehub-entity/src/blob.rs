//! Blob cleanup outbox entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A blob object whose version rows are gone but whose removal from the
/// blob store has not been confirmed yet.
///
/// Rows are written in the same transaction that deletes the versions, so
/// a crash between commit and blob removal cannot leak the object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PendingBlobDeletion {
    /// Blob key to remove.
    pub key: String,
    /// Number of removal attempts that failed so far.
    pub attempts: i32,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
    /// When the key was queued.
    pub enqueued_at: DateTime<Utc>,
    /// When removal was last attempted.
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl PendingBlobDeletion {
    /// A freshly queued key with no attempts.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            attempts: 0,
            last_error: None,
            enqueued_at: Utc::now(),
            last_attempt_at: None,
        }
    }
}
