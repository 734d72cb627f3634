//! Nested directory trees.

use std::collections::HashMap;

use uuid::Uuid;

use treehub_core::error::AppError;
use treehub_core::result::AppResult;
use treehub_entity::{Directory, DirectoryNode};

use super::service::DirectoryService;

impl DirectoryService {
    /// Builds the directory tree rooted at `id` from one containment query.
    pub async fn get_directory_tree(&self, id: Uuid) -> AppResult<DirectoryNode> {
        let root = self
            .get_directory(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Directory {id} not found")))?;
        let (descendants, file_counts) = self.subtree_rows(id).await?;

        let mut by_parent: HashMap<Uuid, Vec<Directory>> = HashMap::new();
        for directory in descendants {
            if let Some(parent_id) = directory.parent_id {
                by_parent.entry(parent_id).or_default().push(directory);
            }
        }
        for children in by_parent.values_mut() {
            children.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        }

        Ok(build_tree(root, &mut by_parent, &file_counts))
    }
}

fn build_tree(
    directory: Directory,
    by_parent: &mut HashMap<Uuid, Vec<Directory>>,
    file_counts: &HashMap<Uuid, u64>,
) -> DirectoryNode {
    let children = by_parent
        .remove(&directory.id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| build_tree(child, by_parent, file_counts))
        .collect();

    DirectoryNode {
        id: directory.id,
        depth: directory.depth(),
        file_count: file_counts.get(&directory.id).copied().unwrap_or(0),
        name: directory.name,
        children,
    }
}
