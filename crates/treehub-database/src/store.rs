//! The row-store contract the tree engine is written against.
//!
//! Implementations must make every batch method atomic: a [`MoveBatch`] or a
//! subtree deletion either commits in full or leaves no trace. Reads filter
//! out soft-deleted rows.

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use treehub_core::result::AppResult;
use treehub_core::types::PageRequest;
use treehub_entity::{Directory, File, FileVersion, PendingBlobDeletion};

/// Which table a rewritten row lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// A row of `directories`.
    Directory,
    /// A row of `files`.
    File,
}

/// New ancestor chain for one descendant row, with the chain it was
/// computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorRewrite {
    /// Table of the row.
    pub kind: NodeKind,
    /// Row id.
    pub id: Uuid,
    /// Ancestors read before planning; the write is rejected if they changed.
    pub expected: Vec<Uuid>,
    /// Ancestors to store.
    pub ancestors: Vec<Uuid>,
}

/// Everything a subtree move writes, committed as one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveBatch {
    /// The directory being moved.
    pub directory_id: Uuid,
    /// Its new parent.
    pub parent_id: Uuid,
    /// Its ancestors as read before planning.
    pub expected: Vec<Uuid>,
    /// Its new ancestors (`parent.ancestors ++ [parent.id]`).
    pub ancestors: Vec<Uuid>,
    /// One rewrite per descendant directory and file.
    pub descendants: Vec<AncestorRewrite>,
}

impl MoveBatch {
    /// Number of rows the batch touches.
    pub fn row_count(&self) -> usize {
        self.descendants.len() + 1
    }

    /// Number of descendant rows of each kind, `(directories, files)`.
    pub fn descendant_counts(&self) -> (usize, usize) {
        let directories = self
            .descendants
            .iter()
            .filter(|r| r.kind == NodeKind::Directory)
            .count();
        (directories, self.descendants.len() - directories)
    }
}

/// What a committed deletion removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtreeDeletion {
    /// Directory rows removed.
    pub directories: u64,
    /// File rows removed.
    pub files: u64,
    /// Version rows removed.
    pub versions: u64,
    /// Blob keys of the removed versions, already queued in the outbox.
    pub blob_keys: Vec<String>,
}

/// Persistent row store for directories, files, versions and the blob
/// deletion outbox.
#[async_trait]
pub trait TreeStore: Send + Sync + Debug + 'static {
    /// Name of the backend, for logs.
    fn backend(&self) -> &str;

    // -- directories --

    /// Find a live directory by id.
    async fn find_directory(&self, id: Uuid) -> AppResult<Option<Directory>>;

    /// Find the root directory.
    async fn find_root(&self) -> AppResult<Option<Directory>>;

    /// Insert the root row unless one exists; returns the stored root either way.
    async fn insert_root(&self, root: &Directory) -> AppResult<Directory>;

    /// Insert a directory under `directory.parent_id`.
    ///
    /// The stored chain is derived from the parent's committed chain at
    /// insert time, not taken from `directory.ancestors`. Returns `None`
    /// when the parent does not exist.
    async fn insert_directory(&self, directory: &Directory) -> AppResult<Option<Directory>>;

    /// Change a directory's name.
    async fn rename_directory(&self, id: Uuid, name: &str) -> AppResult<Option<Directory>>;

    /// Every live directory, ordered by name.
    async fn list_directories(&self) -> AppResult<Vec<Directory>>;

    /// Directories whose name contains `query`, case-insensitively, ordered by name.
    async fn search_directories(&self, query: &str) -> AppResult<Vec<Directory>>;

    /// Directories with the given ids, in no particular order.
    async fn find_directories(&self, ids: &[Uuid]) -> AppResult<Vec<Directory>>;

    /// Directories whose parent is `parent_id`.
    async fn child_directories(&self, parent_id: Uuid) -> AppResult<Vec<Directory>>;

    /// Directories whose ancestors contain `id`, at any depth.
    async fn descendant_directories(&self, id: Uuid) -> AppResult<Vec<Directory>>;

    // -- files --

    /// Find a live file by id.
    async fn find_file(&self, id: Uuid) -> AppResult<Option<File>>;

    /// Insert a file together with its first version.
    ///
    /// The file's chain is derived from its directory's committed chain.
    /// Returns `None` when the directory does not exist.
    async fn insert_file(&self, file: &File, version: &FileVersion) -> AppResult<Option<File>>;

    /// Change a file's name.
    async fn rename_file(&self, id: Uuid, name: &str) -> AppResult<Option<File>>;

    /// Point a file at another directory, recomputing its chain from that
    /// directory's committed chain. Returns `None` if either row is missing.
    async fn relocate_file(&self, id: Uuid, directory_id: Uuid) -> AppResult<Option<File>>;

    /// Files directly inside `directory_id`.
    async fn child_files(&self, directory_id: Uuid) -> AppResult<Vec<File>>;

    /// Files whose ancestors contain `id`, at any depth.
    async fn descendant_files(&self, id: Uuid) -> AppResult<Vec<File>>;

    // -- versions --

    /// Append a version. Returns `None` when the file does not exist.
    async fn insert_version(&self, version: &FileVersion) -> AppResult<Option<FileVersion>>;

    /// Find a version by id.
    async fn find_version(&self, id: Uuid) -> AppResult<Option<FileVersion>>;

    /// A page of a file's versions, newest first.
    async fn list_versions(
        &self,
        file_id: Uuid,
        page: &PageRequest,
    ) -> AppResult<Vec<FileVersion>>;

    /// Latest version of each given file that has one.
    async fn current_versions(&self, file_ids: &[Uuid]) -> AppResult<HashMap<Uuid, FileVersion>>;

    // -- cascades --

    /// Apply a subtree move atomically and return the moved directory.
    ///
    /// Fails with `Conflict` and writes nothing if any row's ancestors no
    /// longer equal its `expected` chain, or if the subtree gained or lost
    /// rows since the batch was planned.
    async fn apply_move(&self, batch: &MoveBatch) -> AppResult<Directory>;

    /// Delete a directory, every descendant directory and file, and their
    /// versions, queueing the version blob keys in the outbox, in one
    /// transaction. Returns `None` if the directory does not exist.
    async fn delete_subtree(&self, id: Uuid) -> AppResult<Option<SubtreeDeletion>>;

    /// Delete a file and its versions, queueing their blob keys, in one
    /// transaction. Returns `None` if the file does not exist.
    async fn delete_file(&self, id: Uuid) -> AppResult<Option<SubtreeDeletion>>;

    // -- aggregates --

    /// Number of live files plus directories whose ancestors contain `id`.
    async fn count_descendants(&self, id: Uuid) -> AppResult<u64>;

    /// Sum of `size` over every version of every descendant file, or `None`
    /// when there is no such version.
    async fn sum_version_sizes(&self, id: Uuid) -> AppResult<Option<i64>>;

    /// Sum of `size` over the latest version of each descendant file, or
    /// `None` when there is no such version.
    async fn sum_current_version_sizes(&self, id: Uuid) -> AppResult<Option<i64>>;

    // -- blob outbox --

    /// Oldest queued blob deletions with fewer than `max_attempts` failures.
    async fn pending_blob_deletions(
        &self,
        limit: u32,
        max_attempts: u32,
    ) -> AppResult<Vec<PendingBlobDeletion>>;

    /// Remove confirmed keys from the outbox.
    async fn ack_blob_deletions(&self, keys: &[String]) -> AppResult<u64>;

    /// Record a failed removal attempt.
    async fn record_blob_failure(&self, key: &str, error: &str) -> AppResult<()>;
}
