//! File creation, move, rename and delete.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use treehub_core::error::AppError;
use treehub_core::result::AppResult;
use treehub_core::traits::BlobStore;
use treehub_database::TreeStore;
use treehub_entity::{File, FileVersion};
use treehub_storage::mime::resolve_mime;
use treehub_storage::{generate_key, validate_key};

use crate::cleanup::BlobReclaimer;
use crate::directory::SubtreeLocks;
use crate::names::validate_name;

/// Request to create a file with its first version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileInput {
    /// File name.
    pub name: String,
    /// Directory the file goes in.
    pub directory_id: Uuid,
    /// MIME type; guessed from the name when blank.
    #[serde(default)]
    pub mime_type: String,
    /// Content size in bytes.
    pub size: i64,
    /// Blob key; generated when absent.
    #[serde(default)]
    pub key: Option<String>,
}

/// Resolve the blob key for an upload: the caller's, validated, or a fresh one.
pub(crate) fn upload_key(requested: Option<&str>, name: &str) -> AppResult<String> {
    let key = match requested.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => key.to_string(),
        None => generate_key(name),
    };
    validate_key(&key)?;
    Ok(key)
}

/// Manages file rows.
#[derive(Debug, Clone)]
pub struct FileService {
    store: Arc<dyn TreeStore>,
    blobs: Arc<dyn BlobStore>,
    locks: SubtreeLocks,
    reclaimer: BlobReclaimer,
}

impl FileService {
    /// Creates a new file service.
    pub fn new(
        store: Arc<dyn TreeStore>,
        blobs: Arc<dyn BlobStore>,
        locks: SubtreeLocks,
        reclaimer: BlobReclaimer,
    ) -> Self {
        Self {
            store,
            blobs,
            locks,
            reclaimer,
        }
    }

    /// Gets a file by ID.
    pub async fn get_file(&self, id: Uuid) -> AppResult<Option<File>> {
        self.store.find_file(id).await
    }

    /// Creates a file and its first version, returning the file and a URL
    /// the content can be uploaded to.
    pub async fn create_file(&self, input: CreateFileInput) -> AppResult<(File, String)> {
        validate_name(&input.name)?;
        if input.size < 0 {
            return Err(AppError::validation("File size cannot be negative"));
        }
        let key = upload_key(input.key.as_deref(), &input.name)?;
        let mime_type = resolve_mime(&input.mime_type, &input.name);

        let directory = self
            .store
            .find_directory(input.directory_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Directory {} not found", input.directory_id))
            })?;

        let upload_url = self.blobs.put_signed_url(&key).await?;

        let file = File::new_in(&input.name, &directory);
        let version = FileVersion::new(file.id, &input.name, mime_type, input.size, &key);

        let _guard = self.locks.acquire(&[], &directory.child_ancestors()).await;
        let file = self
            .store
            .insert_file(&file, &version)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Directory {} not found", input.directory_id))
            })?;

        info!(
            file_id = %file.id,
            directory_id = %file.directory_id,
            key = %key,
            size = input.size,
            "File created"
        );
        Ok((file, upload_url))
    }

    /// Moves a file into another directory.
    pub async fn move_file(&self, id: Uuid, directory_id: Uuid) -> AppResult<File> {
        let file = self.require(id).await?;
        let directory = self
            .store
            .find_directory(directory_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Directory {directory_id} not found")))?;

        let shared: Vec<Uuid> = file
            .ancestors
            .iter()
            .chain(directory.child_ancestors().iter())
            .copied()
            .collect();
        let _guard = self.locks.acquire(&[file.id], &shared).await;
        if self.require(id).await?.ancestors != file.ancestors {
            return Err(AppError::conflict(format!("File {id} moved while waiting for locks")));
        }
        let moved = self
            .store
            .relocate_file(id, directory_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {id} or directory {directory_id} not found")))?;

        info!(
            file_id = %id,
            from = %file.directory_id,
            to = %directory_id,
            "File moved"
        );
        Ok(moved)
    }

    /// Renames a file. Versions keep the name they were uploaded with.
    pub async fn rename_file(&self, id: Uuid, name: &str) -> AppResult<File> {
        validate_name(name)?;
        let file = self
            .store
            .rename_file(id, name)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;

        info!(file_id = %id, new_name = %name, "File renamed");
        Ok(file)
    }

    /// Deletes a file and all its versions, then removes their blobs best
    /// effort.
    pub async fn delete_file(&self, id: Uuid) -> AppResult<bool> {
        let _guard = self.locks.acquire(&[id], &[]).await;
        let deletion = self
            .store
            .delete_file(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;

        info!(file_id = %id, versions = deletion.versions, "File deleted");

        self.reclaimer.reclaim(&deletion.blob_keys).await;
        Ok(true)
    }

    async fn require(&self, id: Uuid) -> AppResult<File> {
        self.store
            .find_file(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }
}
