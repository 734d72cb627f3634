//! Nested directory tree for hierarchical display.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A directory with its descendant directories nested by parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryNode {
    /// Directory ID.
    pub id: Uuid,
    /// Directory name.
    pub name: String,
    /// Depth from the root.
    pub depth: usize,
    /// Number of files directly inside.
    pub file_count: u64,
    /// Child directory nodes, ordered by name.
    pub children: Vec<DirectoryNode>,
}

impl DirectoryNode {
    /// Number of directories in this node's subtree, itself included.
    pub fn total_directories(&self) -> u64 {
        1 + self
            .children
            .iter()
            .map(DirectoryNode::total_directories)
            .sum::<u64>()
    }
}
