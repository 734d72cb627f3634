//! PostgreSQL implementation of [`TreeStore`].
//!
//! Ancestor chains are `UUID[]` columns with GIN indexes; every subtree
//! lookup is the containment predicate `ancestors @> ARRAY[$1]`. Inserts
//! and relocations read the parent row `FOR SHARE` inside their
//! transaction so they cannot derive a chain from a parent that a
//! concurrent move is rewriting.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use treehub_core::error::{AppError, ErrorKind};
use treehub_core::result::AppResult;
use treehub_core::types::PageRequest;
use treehub_entity::{Directory, File, FileVersion, PendingBlobDeletion};

use crate::store::{MoveBatch, NodeKind, SubtreeDeletion, TreeStore};

/// Map a sqlx failure to a database error carrying `message`.
fn db(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Tree store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgTreeStore {
    pool: PgPool,
}

impl PgTreeStore {
    /// Create a store over an already migrated pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<Transaction<'_, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(db("Failed to begin transaction"))
    }

    /// Chain for rows placed directly inside `directory_id`, locking the
    /// directory row until the transaction ends.
    async fn lock_child_chain(
        tx: &mut Transaction<'_, Postgres>,
        directory_id: Uuid,
    ) -> AppResult<Option<Vec<Uuid>>> {
        sqlx::query_scalar::<_, Vec<Uuid>>(
            "SELECT ancestors || id FROM directories \
             WHERE id = $1 AND deleted_at IS NULL FOR SHARE",
        )
        .bind(directory_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db("Failed to lock directory"))
    }

    async fn enqueue_blob_keys(
        tx: &mut Transaction<'_, Postgres>,
        keys: &[String],
    ) -> AppResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "INSERT INTO pending_blob_deletions (key) \
             SELECT * FROM UNNEST($1::text[]) ON CONFLICT (key) DO NOTHING",
        )
        .bind(keys)
        .execute(&mut **tx)
        .await
        .map_err(db("Failed to queue blob deletions"))?;
        Ok(())
    }
}

#[async_trait]
impl TreeStore for PgTreeStore {
    fn backend(&self) -> &str {
        "postgres"
    }

    async fn find_directory(&self, id: Uuid) -> AppResult<Option<Directory>> {
        sqlx::query_as::<_, Directory>(
            "SELECT * FROM directories WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db("Failed to find directory"))
    }

    async fn find_root(&self) -> AppResult<Option<Directory>> {
        sqlx::query_as::<_, Directory>(
            "SELECT * FROM directories WHERE parent_id IS NULL AND deleted_at IS NULL",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(db("Failed to find root directory"))
    }

    async fn insert_root(&self, root: &Directory) -> AppResult<Directory> {
        let inserted = sqlx::query_as::<_, Directory>(
            "INSERT INTO directories (id, name, parent_id, ancestors, created_at, updated_at) \
             VALUES ($1, $2, NULL, '{}', $3, $4) \
             ON CONFLICT DO NOTHING RETURNING *",
        )
        .bind(root.id)
        .bind(&root.name)
        .bind(root.created_at)
        .bind(root.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db("Failed to insert root directory"))?;

        match inserted {
            Some(root) => Ok(root),
            None => self
                .find_root()
                .await?
                .ok_or_else(|| AppError::internal("Root row conflicted but cannot be read")),
        }
    }

    async fn insert_directory(&self, directory: &Directory) -> AppResult<Option<Directory>> {
        let Some(parent_id) = directory.parent_id else {
            return Err(AppError::validation("Only the root directory may lack a parent"));
        };

        let mut tx = self.begin().await?;
        let Some(chain) = Self::lock_child_chain(&mut tx, parent_id).await? else {
            return Ok(None);
        };

        let inserted = sqlx::query_as::<_, Directory>(
            "INSERT INTO directories (id, name, parent_id, ancestors, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(directory.id)
        .bind(&directory.name)
        .bind(parent_id)
        .bind(&chain)
        .bind(directory.created_at)
        .bind(directory.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db("Failed to insert directory"))?;

        tx.commit().await.map_err(db("Failed to commit directory insert"))?;
        Ok(Some(inserted))
    }

    async fn rename_directory(&self, id: Uuid, name: &str) -> AppResult<Option<Directory>> {
        sqlx::query_as::<_, Directory>(
            "UPDATE directories SET name = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db("Failed to rename directory"))
    }

    async fn list_directories(&self) -> AppResult<Vec<Directory>> {
        sqlx::query_as::<_, Directory>(
            "SELECT * FROM directories WHERE deleted_at IS NULL ORDER BY name ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db("Failed to list directories"))
    }

    async fn search_directories(&self, query: &str) -> AppResult<Vec<Directory>> {
        sqlx::query_as::<_, Directory>(
            "SELECT * FROM directories \
             WHERE deleted_at IS NULL AND name ILIKE '%' || $1 || '%' \
             ORDER BY name ASC, id ASC",
        )
        .bind(escape_like(query))
        .fetch_all(&self.pool)
        .await
        .map_err(db("Failed to search directories"))
    }

    async fn find_directories(&self, ids: &[Uuid]) -> AppResult<Vec<Directory>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, Directory>(
            "SELECT * FROM directories WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db("Failed to find directories"))
    }

    async fn child_directories(&self, parent_id: Uuid) -> AppResult<Vec<Directory>> {
        sqlx::query_as::<_, Directory>(
            "SELECT * FROM directories WHERE parent_id = $1 AND deleted_at IS NULL \
             ORDER BY name ASC, id ASC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db("Failed to list child directories"))
    }

    async fn descendant_directories(&self, id: Uuid) -> AppResult<Vec<Directory>> {
        sqlx::query_as::<_, Directory>(
            "SELECT * FROM directories \
             WHERE ancestors @> ARRAY[$1]::uuid[] AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db("Failed to find descendant directories"))
    }

    async fn find_file(&self, id: Uuid) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db("Failed to find file"))
    }

    async fn insert_file(&self, file: &File, version: &FileVersion) -> AppResult<Option<File>> {
        let mut tx = self.begin().await?;
        let Some(chain) = Self::lock_child_chain(&mut tx, file.directory_id).await? else {
            return Ok(None);
        };

        let inserted = sqlx::query_as::<_, File>(
            "INSERT INTO files (id, name, directory_id, ancestors, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(file.id)
        .bind(&file.name)
        .bind(file.directory_id)
        .bind(&chain)
        .bind(file.created_at)
        .bind(file.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db("Failed to insert file"))?;

        sqlx::query(
            "INSERT INTO file_versions \
             (id, file_id, name, mime_type, size, key, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(version.id)
        .bind(inserted.id)
        .bind(&version.name)
        .bind(&version.mime_type)
        .bind(version.size)
        .bind(&version.key)
        .bind(version.created_at)
        .bind(version.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db("Failed to insert initial file version"))?;

        tx.commit().await.map_err(db("Failed to commit file insert"))?;
        Ok(Some(inserted))
    }

    async fn rename_file(&self, id: Uuid, name: &str) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET name = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db("Failed to rename file"))
    }

    async fn relocate_file(&self, id: Uuid, directory_id: Uuid) -> AppResult<Option<File>> {
        let mut tx = self.begin().await?;
        let Some(chain) = Self::lock_child_chain(&mut tx, directory_id).await? else {
            return Ok(None);
        };

        let moved = sqlx::query_as::<_, File>(
            "UPDATE files SET directory_id = $2, ancestors = $3, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .bind(directory_id)
        .bind(&chain)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db("Failed to move file"))?;

        tx.commit().await.map_err(db("Failed to commit file move"))?;
        Ok(moved)
    }

    async fn child_files(&self, directory_id: Uuid) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE directory_id = $1 AND deleted_at IS NULL \
             ORDER BY name ASC, id ASC",
        )
        .bind(directory_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db("Failed to list child files"))
    }

    async fn descendant_files(&self, id: Uuid) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE ancestors @> ARRAY[$1]::uuid[] AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db("Failed to find descendant files"))
    }

    async fn insert_version(&self, version: &FileVersion) -> AppResult<Option<FileVersion>> {
        sqlx::query_as::<_, FileVersion>(
            "INSERT INTO file_versions \
             (id, file_id, name, mime_type, size, key, created_at, updated_at) \
             SELECT $1, f.id, $3, $4, $5, $6, $7, $8 FROM files f \
             WHERE f.id = $2 AND f.deleted_at IS NULL FOR SHARE \
             RETURNING *",
        )
        .bind(version.id)
        .bind(version.file_id)
        .bind(&version.name)
        .bind(&version.mime_type)
        .bind(version.size)
        .bind(&version.key)
        .bind(version.created_at)
        .bind(version.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db("Failed to insert file version"))
    }

    async fn find_version(&self, id: Uuid) -> AppResult<Option<FileVersion>> {
        sqlx::query_as::<_, FileVersion>("SELECT * FROM file_versions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db("Failed to find file version"))
    }

    async fn list_versions(
        &self,
        file_id: Uuid,
        page: &PageRequest,
    ) -> AppResult<Vec<FileVersion>> {
        sqlx::query_as::<_, FileVersion>(
            "SELECT * FROM file_versions WHERE file_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(file_id)
        .bind(to_i64(page.limit()))
        .bind(to_i64(page.offset()))
        .fetch_all(&self.pool)
        .await
        .map_err(db("Failed to list file versions"))
    }

    async fn current_versions(&self, file_ids: &[Uuid]) -> AppResult<HashMap<Uuid, FileVersion>> {
        if file_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let versions = sqlx::query_as::<_, FileVersion>(
            "SELECT DISTINCT ON (file_id) * FROM file_versions WHERE file_id = ANY($1) \
             ORDER BY file_id, created_at DESC, id DESC",
        )
        .bind(file_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db("Failed to load current versions"))?;

        Ok(versions.into_iter().map(|v| (v.file_id, v)).collect())
    }

    async fn apply_move(&self, batch: &MoveBatch) -> AppResult<Directory> {
        let mut tx = self.begin().await?;

        let target_chain = Self::lock_child_chain(&mut tx, batch.parent_id).await?;
        if target_chain.as_deref() != Some(batch.ancestors.as_slice()) {
            return Err(AppError::conflict("Move target changed while planning"));
        }

        let moved = sqlx::query_as::<_, Directory>(
            "UPDATE directories SET parent_id = $2, ancestors = $3, updated_at = NOW() \
             WHERE id = $1 AND ancestors = $4 AND deleted_at IS NULL RETURNING *",
        )
        .bind(batch.directory_id)
        .bind(batch.parent_id)
        .bind(&batch.ancestors)
        .bind(&batch.expected)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db("Failed to move directory"))?
        .ok_or_else(|| AppError::conflict("Moved directory changed while planning"))?;

        for rewrite in &batch.descendants {
            let sql = match rewrite.kind {
                NodeKind::Directory => {
                    "UPDATE directories SET ancestors = $2, updated_at = NOW() \
                     WHERE id = $1 AND ancestors = $3 AND deleted_at IS NULL"
                }
                NodeKind::File => {
                    "UPDATE files SET ancestors = $2, updated_at = NOW() \
                     WHERE id = $1 AND ancestors = $3 AND deleted_at IS NULL"
                }
            };
            let result = sqlx::query(sql)
                .bind(rewrite.id)
                .bind(&rewrite.ancestors)
                .bind(&rewrite.expected)
                .execute(&mut *tx)
                .await
                .map_err(db("Failed to rebase descendant"))?;
            if result.rows_affected() != 1 {
                return Err(AppError::conflict(format!(
                    "Descendant {} changed while planning",
                    rewrite.id
                )));
            }
        }

        let (directories, files): (i64, i64) = sqlx::query_as(
            "SELECT \
               (SELECT COUNT(*) FROM directories \
                WHERE ancestors @> ARRAY[$1]::uuid[] AND deleted_at IS NULL), \
               (SELECT COUNT(*) FROM files \
                WHERE ancestors @> ARRAY[$1]::uuid[] AND deleted_at IS NULL)",
        )
        .bind(batch.directory_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db("Failed to verify moved subtree"))?;

        let (planned_directories, planned_files) = batch.descendant_counts();
        if directories as usize != planned_directories || files as usize != planned_files {
            return Err(AppError::conflict("Subtree gained or lost rows while planning"));
        }

        tx.commit().await.map_err(db("Failed to commit move"))?;
        debug!(
            directory_id = %batch.directory_id,
            rows = batch.row_count(),
            "Move batch committed"
        );
        Ok(moved)
    }

    async fn delete_subtree(&self, id: Uuid) -> AppResult<Option<SubtreeDeletion>> {
        let mut tx = self.begin().await?;

        let exists = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM directories WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db("Failed to lock directory"))?;
        if exists.is_none() {
            return Ok(None);
        }

        // Lock the subtree's files before touching their versions so a file
        // relocated into or out of the subtree cannot slip between the deletes.
        let file_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM files WHERE ancestors @> ARRAY[$1]::uuid[] ORDER BY id FOR UPDATE",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db("Failed to lock subtree files"))?;

        let mut blob_keys = sqlx::query_scalar::<_, String>(
            "DELETE FROM file_versions WHERE file_id = ANY($1) RETURNING key",
        )
        .bind(&file_ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(db("Failed to delete subtree versions"))?;
        let versions = blob_keys.len() as u64;

        let files = sqlx::query("DELETE FROM files WHERE id = ANY($1)")
            .bind(&file_ids)
            .execute(&mut *tx)
            .await
            .map_err(db("Failed to delete subtree files"))?
            .rows_affected();

        let directories = sqlx::query(
            "DELETE FROM directories WHERE id = $1 OR ancestors @> ARRAY[$1]::uuid[]",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db("Failed to delete subtree directories"))?
        .rows_affected();

        blob_keys.sort();
        blob_keys.dedup();
        Self::enqueue_blob_keys(&mut tx, &blob_keys).await?;

        tx.commit().await.map_err(db("Failed to commit subtree delete"))?;
        Ok(Some(SubtreeDeletion {
            directories,
            files,
            versions,
            blob_keys,
        }))
    }

    async fn delete_file(&self, id: Uuid) -> AppResult<Option<SubtreeDeletion>> {
        let mut tx = self.begin().await?;

        let exists = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM files WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db("Failed to lock file"))?;
        if exists.is_none() {
            return Ok(None);
        }

        let mut blob_keys = sqlx::query_scalar::<_, String>(
            "DELETE FROM file_versions WHERE file_id = $1 RETURNING key",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db("Failed to delete file versions"))?;
        let versions = blob_keys.len() as u64;

        let files = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db("Failed to delete file"))?
            .rows_affected();

        blob_keys.sort();
        blob_keys.dedup();
        Self::enqueue_blob_keys(&mut tx, &blob_keys).await?;

        tx.commit().await.map_err(db("Failed to commit file delete"))?;
        Ok(Some(SubtreeDeletion {
            directories: 0,
            files,
            versions,
            blob_keys,
        }))
    }

    async fn count_descendants(&self, id: Uuid) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT \
               (SELECT COUNT(*) FROM directories \
                WHERE ancestors @> ARRAY[$1]::uuid[] AND deleted_at IS NULL) \
             + (SELECT COUNT(*) FROM files \
                WHERE ancestors @> ARRAY[$1]::uuid[] AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(db("Failed to count descendants"))?;
        Ok(count.max(0) as u64)
    }

    async fn sum_version_sizes(&self, id: Uuid) -> AppResult<Option<i64>> {
        sqlx::query_scalar::<_, Option<i64>>(
            "SELECT SUM(v.size)::BIGINT FROM file_versions v \
             JOIN files f ON f.id = v.file_id \
             WHERE f.ancestors @> ARRAY[$1]::uuid[] AND f.deleted_at IS NULL",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(db("Failed to sum version sizes"))
    }

    async fn sum_current_version_sizes(&self, id: Uuid) -> AppResult<Option<i64>> {
        sqlx::query_scalar::<_, Option<i64>>(
            "SELECT SUM(size)::BIGINT FROM ( \
               SELECT DISTINCT ON (v.file_id) v.size FROM file_versions v \
               JOIN files f ON f.id = v.file_id \
               WHERE f.ancestors @> ARRAY[$1]::uuid[] AND f.deleted_at IS NULL \
               ORDER BY v.file_id, v.created_at DESC, v.id DESC \
             ) current_versions",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(db("Failed to sum current version sizes"))
    }

    async fn pending_blob_deletions(
        &self,
        limit: u32,
        max_attempts: u32,
    ) -> AppResult<Vec<PendingBlobDeletion>> {
        sqlx::query_as::<_, PendingBlobDeletion>(
            "SELECT * FROM pending_blob_deletions WHERE attempts < $2 \
             ORDER BY enqueued_at ASC, key ASC LIMIT $1",
        )
        .bind(i64::from(limit))
        .bind(i32::try_from(max_attempts).unwrap_or(i32::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(db("Failed to load pending blob deletions"))
    }

    async fn ack_blob_deletions(&self, keys: &[String]) -> AppResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM pending_blob_deletions WHERE key = ANY($1)")
            .bind(keys)
            .execute(&self.pool)
            .await
            .map_err(db("Failed to acknowledge blob deletions"))?;
        Ok(result.rows_affected())
    }

    async fn record_blob_failure(&self, key: &str, error: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE pending_blob_deletions \
             SET attempts = attempts + 1, last_error = $2, last_attempt_at = $3 \
             WHERE key = $1",
        )
        .bind(key)
        .bind(error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db("Failed to record blob deletion failure"))?;
        Ok(())
    }
}
