//! Rows returned by directory content listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::directory::Directory;
use crate::file::{File, FileVersion};

/// Whether a content row describes a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    /// A file, described by its current version.
    File,
    /// A directory.
    Directory,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRow {
    /// File or directory id.
    pub id: Uuid,
    /// File or directory name.
    pub name: String,
    /// Current version MIME type; empty for directories.
    pub mime_type: String,
    /// Current version size; 0 for directories.
    pub size: i64,
    /// Current version blob key; empty for directories.
    pub key: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Entry kind.
    #[serde(rename = "type")]
    pub kind: ContentKind,
}

impl ContentRow {
    /// Row for a file described by its current version, if it has one.
    pub fn from_file(file: &File, current: Option<&FileVersion>) -> Self {
        Self {
            id: file.id,
            name: file.name.clone(),
            mime_type: current.map(|v| v.mime_type.clone()).unwrap_or_default(),
            size: current.map(|v| v.size).unwrap_or(0),
            key: current.map(|v| v.key.clone()).unwrap_or_default(),
            created_at: file.created_at,
            updated_at: file.updated_at,
            kind: ContentKind::File,
        }
    }

    /// Row for a directory.
    pub fn from_directory(directory: &Directory) -> Self {
        Self {
            id: directory.id,
            name: directory.name.clone(),
            mime_type: String::new(),
            size: 0,
            key: String::new(),
            created_at: directory.created_at,
            updated_at: directory.updated_at,
            kind: ContentKind::Directory,
        }
    }
}
