//! File version entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An immutable, append-only version of a file's content.
///
/// The current version of a file is the one with the latest `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FileVersion {
    /// Unique version identifier.
    pub id: Uuid,
    /// The file this version belongs to.
    pub file_id: Uuid,
    /// Name at upload time.
    pub name: String,
    /// MIME type of the content.
    pub mime_type: String,
    /// Size in bytes.
    pub size: i64,
    /// Opaque blob store locator.
    pub key: String,
    /// When this version was created.
    pub created_at: DateTime<Utc>,
    /// When this version row was last written.
    pub updated_at: DateTime<Utc>,
}

impl FileVersion {
    /// Build a new version row for `file_id`.
    pub fn new(
        file_id: Uuid,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        size: i64,
        key: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            file_id,
            name: name.into(),
            mime_type: mime_type.into(),
            size,
            key: key.into(),
            created_at: now,
            updated_at: now,
        }
    }
}
