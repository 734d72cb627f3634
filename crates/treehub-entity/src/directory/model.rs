//! Directory entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::file::File;

/// Name of the singleton root directory.
pub const ROOT_NAME: &str = "root";

/// Whether `name` collides with the root sentinel (case-insensitive).
pub fn is_reserved_name(name: &str) -> bool {
    name.eq_ignore_ascii_case(ROOT_NAME)
}

/// A directory in the namespace tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    /// Unique directory identifier.
    pub id: Uuid,
    /// Directory name.
    pub name: String,
    /// Parent directory ID (null only for the root).
    pub parent_id: Option<Uuid>,
    /// Ancestor ids, root first, excluding this directory.
    pub ancestors: Vec<Uuid>,
    /// When the directory was created.
    pub created_at: DateTime<Utc>,
    /// When the directory was last updated.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Directory {
    /// Build the root directory row.
    pub fn root() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: ROOT_NAME.to_string(),
            parent_id: None,
            ancestors: Vec::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Build a new directory placed directly under `parent`.
    pub fn new_child(name: impl Into<String>, parent: &Directory) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            parent_id: Some(parent.id),
            ancestors: parent.child_ancestors(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Check if this is the root directory (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Ancestor chain of anything placed directly inside this directory.
    pub fn child_ancestors(&self) -> Vec<Uuid> {
        let mut chain = Vec::with_capacity(self.ancestors.len() + 1);
        chain.extend_from_slice(&self.ancestors);
        chain.push(self.id);
        chain
    }

    /// Depth from the root (root is 0).
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    /// Whether `id` is this directory or one of its ancestors.
    pub fn is_within(&self, id: Uuid) -> bool {
        self.id == id || self.ancestors.contains(&id)
    }
}

/// Immediate children of a directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryChildren {
    /// Directories whose parent is the directory.
    pub directories: Vec<Directory>,
    /// Files whose owning directory is the directory.
    pub files: Vec<File>,
}
