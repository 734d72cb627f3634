//! In-process implementation of [`TreeStore`].
//!
//! All tables live behind one `RwLock`, so every method is trivially
//! atomic: batches validate first and only then mutate while holding the
//! write guard.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use treehub_core::error::AppError;
use treehub_core::result::AppResult;
use treehub_core::types::PageRequest;
use treehub_entity::{Directory, File, FileVersion, PendingBlobDeletion};

use crate::store::{MoveBatch, NodeKind, SubtreeDeletion, TreeStore};

/// Sum of `sizes`, `None` when empty. Totals past `i64::MAX` fail the way
/// the `BIGINT` cast does in PostgreSQL.
fn checked_total(sizes: impl Iterator<Item = i64>) -> AppResult<Option<i64>> {
    let mut sizes = sizes.peekable();
    if sizes.peek().is_none() {
        return Ok(None);
    }
    sizes
        .try_fold(0i64, i64::checked_add)
        .map(Some)
        .ok_or_else(|| AppError::database("Size total is out of range for bigint"))
}

#[derive(Debug, Default)]
struct Tables {
    directories: HashMap<Uuid, Directory>,
    files: HashMap<Uuid, File>,
    versions: HashMap<Uuid, FileVersion>,
    pending: HashMap<String, PendingBlobDeletion>,
}

impl Tables {
    fn live_directory(&self, id: Uuid) -> Option<&Directory> {
        self.directories.get(&id).filter(|d| d.deleted_at.is_none())
    }

    fn live_file(&self, id: Uuid) -> Option<&File> {
        self.files.get(&id).filter(|f| f.deleted_at.is_none())
    }

    fn current_version(&self, file_id: Uuid) -> Option<&FileVersion> {
        self.versions
            .values()
            .filter(|v| v.file_id == file_id)
            .max_by_key(|v| (v.created_at, v.id))
    }

    fn descendant_files(&self, id: Uuid) -> impl Iterator<Item = &File> {
        self.files
            .values()
            .filter(move |f| f.deleted_at.is_none() && f.ancestors.contains(&id))
    }

    fn descendant_directories(&self, id: Uuid) -> impl Iterator<Item = &Directory> {
        self.directories
            .values()
            .filter(move |d| d.deleted_at.is_none() && d.ancestors.contains(&id))
    }

    /// Remove the given files and their versions, returning
    /// `(versions removed, blob keys)`.
    fn remove_files(&mut self, file_ids: &[Uuid]) -> (u64, Vec<String>) {
        let doomed: Vec<Uuid> = self
            .versions
            .values()
            .filter(|v| file_ids.contains(&v.file_id))
            .map(|v| v.id)
            .collect();
        let mut keys = Vec::with_capacity(doomed.len());
        for id in &doomed {
            if let Some(version) = self.versions.remove(id) {
                keys.push(version.key);
            }
        }
        for id in file_ids {
            self.files.remove(id);
        }
        keys.sort();
        keys.dedup();
        (doomed.len() as u64, keys)
    }

    fn enqueue(&mut self, keys: &[String]) {
        for key in keys {
            self.pending
                .entry(key.clone())
                .or_insert_with(|| PendingBlobDeletion::new(key.clone()));
        }
    }
}

fn sorted_by_name(mut directories: Vec<Directory>) -> Vec<Directory> {
    directories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    directories
}

/// Tree store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryTreeStore {
    tables: RwLock<Tables>,
}

impl MemoryTreeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued blob deletions, including exhausted ones.
    pub async fn pending_len(&self) -> usize {
        self.tables.read().await.pending.len()
    }
}

#[async_trait]
impl TreeStore for MemoryTreeStore {
    fn backend(&self) -> &str {
        "memory"
    }

    async fn find_directory(&self, id: Uuid) -> AppResult<Option<Directory>> {
        Ok(self.tables.read().await.live_directory(id).cloned())
    }

    async fn find_root(&self) -> AppResult<Option<Directory>> {
        let tables = self.tables.read().await;
        Ok(tables
            .directories
            .values()
            .find(|d| d.is_root() && d.deleted_at.is_none())
            .cloned())
    }

    async fn insert_root(&self, root: &Directory) -> AppResult<Directory> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.directories.values().find(|d| d.is_root()) {
            return Ok(existing.clone());
        }
        let mut row = root.clone();
        row.parent_id = None;
        row.ancestors = Vec::new();
        tables.directories.insert(row.id, row.clone());
        Ok(row)
    }

    async fn insert_directory(&self, directory: &Directory) -> AppResult<Option<Directory>> {
        let Some(parent_id) = directory.parent_id else {
            return Err(AppError::validation("Only the root directory may lack a parent"));
        };

        let mut tables = self.tables.write().await;
        let Some(parent) = tables.live_directory(parent_id) else {
            return Ok(None);
        };
        let mut row = directory.clone();
        row.ancestors = parent.child_ancestors();
        tables.directories.insert(row.id, row.clone());
        Ok(Some(row))
    }

    async fn rename_directory(&self, id: Uuid, name: &str) -> AppResult<Option<Directory>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .directories
            .get_mut(&id)
            .filter(|d| d.deleted_at.is_none())
            .map(|d| {
                d.name = name.to_string();
                d.updated_at = Utc::now();
                d.clone()
            }))
    }

    async fn list_directories(&self) -> AppResult<Vec<Directory>> {
        let tables = self.tables.read().await;
        Ok(sorted_by_name(
            tables
                .directories
                .values()
                .filter(|d| d.deleted_at.is_none())
                .cloned()
                .collect(),
        ))
    }

    async fn search_directories(&self, query: &str) -> AppResult<Vec<Directory>> {
        let needle = query.to_lowercase();
        let tables = self.tables.read().await;
        Ok(sorted_by_name(
            tables
                .directories
                .values()
                .filter(|d| d.deleted_at.is_none() && d.name.to_lowercase().contains(&needle))
                .cloned()
                .collect(),
        ))
    }

    async fn find_directories(&self, ids: &[Uuid]) -> AppResult<Vec<Directory>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.live_directory(*id).cloned())
            .collect())
    }

    async fn child_directories(&self, parent_id: Uuid) -> AppResult<Vec<Directory>> {
        let tables = self.tables.read().await;
        Ok(sorted_by_name(
            tables
                .directories
                .values()
                .filter(|d| d.deleted_at.is_none() && d.parent_id == Some(parent_id))
                .cloned()
                .collect(),
        ))
    }

    async fn descendant_directories(&self, id: Uuid) -> AppResult<Vec<Directory>> {
        let tables = self.tables.read().await;
        Ok(tables.descendant_directories(id).cloned().collect())
    }

    async fn find_file(&self, id: Uuid) -> AppResult<Option<File>> {
        Ok(self.tables.read().await.live_file(id).cloned())
    }

    async fn insert_file(&self, file: &File, version: &FileVersion) -> AppResult<Option<File>> {
        let mut tables = self.tables.write().await;
        let Some(directory) = tables.live_directory(file.directory_id) else {
            return Ok(None);
        };
        let mut row = file.clone();
        row.ancestors = directory.child_ancestors();
        let mut first = version.clone();
        first.file_id = row.id;
        tables.files.insert(row.id, row.clone());
        tables.versions.insert(first.id, first);
        Ok(Some(row))
    }

    async fn rename_file(&self, id: Uuid, name: &str) -> AppResult<Option<File>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .files
            .get_mut(&id)
            .filter(|f| f.deleted_at.is_none())
            .map(|f| {
                f.name = name.to_string();
                f.updated_at = Utc::now();
                f.clone()
            }))
    }

    async fn relocate_file(&self, id: Uuid, directory_id: Uuid) -> AppResult<Option<File>> {
        let mut tables = self.tables.write().await;
        let Some(chain) = tables
            .live_directory(directory_id)
            .map(Directory::child_ancestors)
        else {
            return Ok(None);
        };
        Ok(tables
            .files
            .get_mut(&id)
            .filter(|f| f.deleted_at.is_none())
            .map(|f| {
                f.directory_id = directory_id;
                f.ancestors = chain;
                f.updated_at = Utc::now();
                f.clone()
            }))
    }

    async fn child_files(&self, directory_id: Uuid) -> AppResult<Vec<File>> {
        let tables = self.tables.read().await;
        let mut files: Vec<File> = tables
            .files
            .values()
            .filter(|f| f.deleted_at.is_none() && f.directory_id == directory_id)
            .cloned()
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(files)
    }

    async fn descendant_files(&self, id: Uuid) -> AppResult<Vec<File>> {
        let tables = self.tables.read().await;
        Ok(tables.descendant_files(id).cloned().collect())
    }

    async fn insert_version(&self, version: &FileVersion) -> AppResult<Option<FileVersion>> {
        let mut tables = self.tables.write().await;
        if tables.live_file(version.file_id).is_none() {
            return Ok(None);
        }
        tables.versions.insert(version.id, version.clone());
        Ok(Some(version.clone()))
    }

    async fn find_version(&self, id: Uuid) -> AppResult<Option<FileVersion>> {
        Ok(self.tables.read().await.versions.get(&id).cloned())
    }

    async fn list_versions(
        &self,
        file_id: Uuid,
        page: &PageRequest,
    ) -> AppResult<Vec<FileVersion>> {
        let tables = self.tables.read().await;
        let mut versions: Vec<FileVersion> = tables
            .versions
            .values()
            .filter(|v| v.file_id == file_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(page.apply(versions))
    }

    async fn current_versions(&self, file_ids: &[Uuid]) -> AppResult<HashMap<Uuid, FileVersion>> {
        let tables = self.tables.read().await;
        Ok(file_ids
            .iter()
            .filter_map(|id| tables.current_version(*id).map(|v| (*id, v.clone())))
            .collect())
    }

    async fn apply_move(&self, batch: &MoveBatch) -> AppResult<Directory> {
        let mut tables = self.tables.write().await;

        let target_chain = tables
            .live_directory(batch.parent_id)
            .map(Directory::child_ancestors);
        if target_chain.as_deref() != Some(batch.ancestors.as_slice()) {
            return Err(AppError::conflict("Move target changed while planning"));
        }
        match tables.live_directory(batch.directory_id) {
            Some(moved) if moved.ancestors == batch.expected => {}
            _ => return Err(AppError::conflict("Moved directory changed while planning")),
        }
        for rewrite in &batch.descendants {
            let current = match rewrite.kind {
                NodeKind::Directory => tables.live_directory(rewrite.id).map(|d| &d.ancestors),
                NodeKind::File => tables.live_file(rewrite.id).map(|f| &f.ancestors),
            };
            if current != Some(&rewrite.expected) {
                return Err(AppError::conflict(format!(
                    "Descendant {} changed while planning",
                    rewrite.id
                )));
            }
        }
        let planned = batch.descendant_counts();
        let actual = (
            tables.descendant_directories(batch.directory_id).count(),
            tables.descendant_files(batch.directory_id).count(),
        );
        if planned != actual {
            return Err(AppError::conflict("Subtree gained or lost rows while planning"));
        }

        let now = Utc::now();
        for rewrite in &batch.descendants {
            match rewrite.kind {
                NodeKind::Directory => {
                    if let Some(d) = tables.directories.get_mut(&rewrite.id) {
                        d.ancestors = rewrite.ancestors.clone();
                        d.updated_at = now;
                    }
                }
                NodeKind::File => {
                    if let Some(f) = tables.files.get_mut(&rewrite.id) {
                        f.ancestors = rewrite.ancestors.clone();
                        f.updated_at = now;
                    }
                }
            }
        }
        let moved = tables
            .directories
            .get_mut(&batch.directory_id)
            .ok_or_else(|| AppError::internal("Moved directory vanished under write lock"))?;
        moved.parent_id = Some(batch.parent_id);
        moved.ancestors = batch.ancestors.clone();
        moved.updated_at = now;
        Ok(moved.clone())
    }

    async fn delete_subtree(&self, id: Uuid) -> AppResult<Option<SubtreeDeletion>> {
        let mut tables = self.tables.write().await;
        if tables.live_directory(id).is_none() {
            return Ok(None);
        }

        let file_ids: Vec<Uuid> = tables
            .files
            .values()
            .filter(|f| f.ancestors.contains(&id))
            .map(|f| f.id)
            .collect();
        let (versions, blob_keys) = tables.remove_files(&file_ids);

        let before = tables.directories.len();
        tables
            .directories
            .retain(|_, d| d.id != id && !d.ancestors.contains(&id));
        let directories = (before - tables.directories.len()) as u64;

        tables.enqueue(&blob_keys);
        Ok(Some(SubtreeDeletion {
            directories,
            files: file_ids.len() as u64,
            versions,
            blob_keys,
        }))
    }

    async fn delete_file(&self, id: Uuid) -> AppResult<Option<SubtreeDeletion>> {
        let mut tables = self.tables.write().await;
        if tables.live_file(id).is_none() {
            return Ok(None);
        }
        let (versions, blob_keys) = tables.remove_files(&[id]);
        tables.enqueue(&blob_keys);
        Ok(Some(SubtreeDeletion {
            directories: 0,
            files: 1,
            versions,
            blob_keys,
        }))
    }

    async fn count_descendants(&self, id: Uuid) -> AppResult<u64> {
        let tables = self.tables.read().await;
        let count = tables.descendant_directories(id).count() + tables.descendant_files(id).count();
        Ok(count as u64)
    }

    async fn sum_version_sizes(&self, id: Uuid) -> AppResult<Option<i64>> {
        let tables = self.tables.read().await;
        let file_ids: Vec<Uuid> = tables.descendant_files(id).map(|f| f.id).collect();
        let sizes = tables
            .versions
            .values()
            .filter(|v| file_ids.contains(&v.file_id))
            .map(|v| v.size);
        checked_total(sizes)
    }

    async fn sum_current_version_sizes(&self, id: Uuid) -> AppResult<Option<i64>> {
        let tables = self.tables.read().await;
        let sizes = tables
            .descendant_files(id)
            .filter_map(|f| tables.current_version(f.id))
            .map(|v| v.size);
        checked_total(sizes)
    }

    async fn pending_blob_deletions(
        &self,
        limit: u32,
        max_attempts: u32,
    ) -> AppResult<Vec<PendingBlobDeletion>> {
        let tables = self.tables.read().await;
        let mut pending: Vec<PendingBlobDeletion> = tables
            .pending
            .values()
            .filter(|p| (p.attempts.max(0) as u32) < max_attempts)
            .cloned()
            .collect();
        pending.sort_by(|a, b| (a.enqueued_at, &a.key).cmp(&(b.enqueued_at, &b.key)));
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn ack_blob_deletions(&self, keys: &[String]) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        Ok(keys
            .iter()
            .filter(|k| tables.pending.remove(*k).is_some())
            .count() as u64)
    }

    async fn record_blob_failure(&self, key: &str, error: &str) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(entry) = tables.pending.get_mut(key) {
            entry.attempts += 1;
            entry.last_error = Some(error.to_string());
            entry.last_attempt_at = Some(Utc::now());
        }
        Ok(())
    }
}
