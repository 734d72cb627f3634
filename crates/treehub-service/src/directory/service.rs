//! Directory service: the writer side of the materialized ancestor paths.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use treehub_core::config::TreeConfig;
use treehub_core::error::{AppError, ErrorKind};
use treehub_core::result::AppResult;
use treehub_database::TreeStore;
use treehub_entity::{Directory, DirectoryChildren};

use crate::cleanup::BlobReclaimer;
use crate::names::validate_directory_name;

use super::lock::SubtreeLocks;
use super::rebase::plan_move;

/// Creates, renames, moves and deletes directories.
#[derive(Debug, Clone)]
pub struct DirectoryService {
    store: Arc<dyn TreeStore>,
    locks: SubtreeLocks,
    reclaimer: BlobReclaimer,
    config: TreeConfig,
}

impl DirectoryService {
    /// Creates a new directory service.
    pub fn new(
        store: Arc<dyn TreeStore>,
        locks: SubtreeLocks,
        reclaimer: BlobReclaimer,
        config: TreeConfig,
    ) -> Self {
        Self {
            store,
            locks,
            reclaimer,
            config,
        }
    }

    /// Seed the singleton root directory if it does not exist yet.
    pub async fn ensure_root(&self) -> AppResult<Directory> {
        if let Some(root) = self.store.find_root().await? {
            return Ok(root);
        }
        let root = self.store.insert_root(&Directory::root()).await?;
        info!(directory_id = %root.id, "Root directory seeded");
        Ok(root)
    }

    /// The root directory.
    pub async fn get_root(&self) -> AppResult<Directory> {
        self.store
            .find_root()
            .await?
            .ok_or_else(|| AppError::not_found("Root directory has not been seeded"))
    }

    /// Gets a directory by ID.
    pub async fn get_directory(&self, id: Uuid) -> AppResult<Option<Directory>> {
        self.store.find_directory(id).await
    }

    /// Immediate child directories and files of a directory.
    pub async fn get_directory_children(&self, id: Uuid) -> AppResult<DirectoryChildren> {
        let directories = self.store.child_directories(id).await?;
        let files = self.store.child_files(id).await?;
        Ok(DirectoryChildren { directories, files })
    }

    /// All directories, ordered by name.
    pub async fn list_directories(&self) -> AppResult<Vec<Directory>> {
        self.store.list_directories().await
    }

    /// Directories whose name contains `query`, ignoring case.
    pub async fn find_directories(&self, query: &str) -> AppResult<Vec<Directory>> {
        self.store.search_directories(query.trim()).await
    }

    /// The chain from the root down to `id`, both included.
    pub async fn get_breadcrumbs(&self, id: Uuid) -> AppResult<Vec<Directory>> {
        let directory = self.require(id).await?;
        let mut by_id: HashMap<Uuid, Directory> = self
            .store
            .find_directories(&directory.ancestors)
            .await?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();

        let mut breadcrumbs: Vec<Directory> = directory
            .ancestors
            .iter()
            .filter_map(|ancestor| by_id.remove(ancestor))
            .collect();
        breadcrumbs.push(directory);
        Ok(breadcrumbs)
    }

    /// Creates a directory under `parent_id`.
    pub async fn create_directory(&self, name: &str, parent_id: Uuid) -> AppResult<Directory> {
        validate_directory_name(name)?;
        let parent = self
            .store
            .find_directory(parent_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Parent directory {parent_id} not found")))?;

        let _guard = self.locks.acquire(&[], &parent.child_ancestors()).await;
        let directory = self
            .store
            .insert_directory(&Directory::new_child(name, &parent))
            .await?
            .ok_or_else(|| AppError::not_found(format!("Parent directory {parent_id} not found")))?;

        info!(
            directory_id = %directory.id,
            parent_id = %parent_id,
            depth = directory.depth(),
            "Directory created"
        );
        Ok(directory)
    }

    /// Renames a directory. Ancestor chains are untouched.
    pub async fn rename_directory(&self, id: Uuid, name: &str) -> AppResult<Directory> {
        validate_directory_name(name)?;
        let current = self.require(id).await?;
        if current.is_root() {
            return Err(AppError::reserved_name("The root directory cannot be renamed"));
        }

        let directory = self
            .store
            .rename_directory(id, name)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Directory {id} not found")))?;

        info!(directory_id = %id, new_name = %name, "Directory renamed");
        Ok(directory)
    }

    /// Moves a directory and its whole subtree under `target_id`.
    ///
    /// Retries the read-plan-commit cycle when the store reports a
    /// concurrent modification, up to `tree.max_move_retries` times.
    pub async fn move_directory(&self, id: Uuid, target_id: Uuid) -> AppResult<Directory> {
        let mut retries = 0;
        loop {
            match self.try_move(id, target_id).await {
                Err(e) if e.kind == ErrorKind::Conflict && retries < self.config.max_move_retries => {
                    retries += 1;
                    warn!(
                        directory_id = %id,
                        target_id = %target_id,
                        retries,
                        error = %e,
                        "Move conflicted, retrying"
                    );
                }
                result => return result,
            }
        }
    }

    async fn try_move(&self, id: Uuid, target_id: Uuid) -> AppResult<Directory> {
        let (source, target) = self.load_move_pair(id, target_id).await?;

        let mut shared = source.ancestors.clone();
        shared.extend(target.child_ancestors());
        let _guard = self.locks.acquire(&[source.id], &shared).await;

        // Chains may have changed while waiting for the locks.
        let (source_now, target_now) = self.load_move_pair(id, target_id).await?;
        if source_now.ancestors != source.ancestors || target_now.ancestors != target.ancestors {
            return Err(AppError::conflict("Ancestor chains changed while acquiring locks"));
        }

        let directories = self.store.descendant_directories(id).await?;
        let files = self.store.descendant_files(id).await?;
        self.check_cascade(1 + directories.len() + files.len())?;

        let batch = plan_move(&source_now, &target_now, &directories, &files)?;
        let moved = self.store.apply_move(&batch).await?;

        info!(
            directory_id = %id,
            target_id = %target_id,
            rows = batch.row_count(),
            "Directory moved"
        );
        Ok(moved)
    }

    /// Load and validate the source and target of a move.
    async fn load_move_pair(&self, id: Uuid, target_id: Uuid) -> AppResult<(Directory, Directory)> {
        let source = self.require(id).await?;
        let target = self
            .store
            .find_directory(target_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Target directory {target_id} not found")))?;

        if target.id == source.id {
            return Err(AppError::invalid_target("Cannot move a directory into itself"));
        }
        if target.ancestors.contains(&source.id) {
            return Err(AppError::invalid_target(
                "Cannot move a directory into one of its descendants",
            ));
        }
        Ok((source, target))
    }

    /// Deletes a directory, its subtree and every version under it.
    ///
    /// Rows go in one transaction that also queues the blob keys; the
    /// objects are then removed best effort and any failures are left for
    /// the blob reaper.
    pub async fn delete_directory(&self, id: Uuid) -> AppResult<bool> {
        let directory = self.require(id).await?;
        if directory.is_root() {
            return Err(AppError::reserved_name("The root directory cannot be deleted"));
        }

        let _guard = self.locks.acquire(&[id], &directory.ancestors).await;

        if self.config.max_cascade_rows > 0 {
            let rows = self.store.count_descendants(id).await? as usize + 1;
            self.check_cascade(rows)?;
        }

        let deletion = self
            .store
            .delete_subtree(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Directory {id} not found")))?;

        info!(
            directory_id = %id,
            directories = deletion.directories,
            files = deletion.files,
            versions = deletion.versions,
            "Directory deleted"
        );

        self.reclaimer.reclaim(&deletion.blob_keys).await;
        Ok(true)
    }

    /// Descendant directories of `id` and the number of files directly in
    /// each directory of the subtree.
    pub(super) async fn subtree_rows(
        &self,
        id: Uuid,
    ) -> AppResult<(Vec<Directory>, HashMap<Uuid, u64>)> {
        let directories = self.store.descendant_directories(id).await?;
        let mut file_counts = HashMap::new();
        for file in self.store.descendant_files(id).await? {
            *file_counts.entry(file.directory_id).or_insert(0) += 1;
        }
        Ok((directories, file_counts))
    }

    async fn require(&self, id: Uuid) -> AppResult<Directory> {
        self.store
            .find_directory(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Directory {id} not found")))
    }

    fn check_cascade(&self, rows: usize) -> AppResult<()> {
        let limit = self.config.max_cascade_rows;
        if limit > 0 && rows > limit {
            return Err(AppError::validation(format!(
                "Operation would touch {rows} rows, above the limit of {limit}"
            )));
        }
        Ok(())
    }
}
