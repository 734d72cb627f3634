//! Append-only file versions and download URLs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use treehub_core::error::AppError;
use treehub_core::result::AppResult;
use treehub_core::traits::BlobStore;
use treehub_core::types::PageRequest;
use treehub_database::TreeStore;
use treehub_entity::FileVersion;
use treehub_storage::mime::resolve_mime;
use treehub_storage::validate_key;

use crate::directory::SubtreeLocks;
use crate::names::validate_name;

use super::service::upload_key;

/// Request to upload a new version of a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVersionInput {
    /// File the version belongs to.
    pub file_id: Uuid,
    /// Name at upload time; the file's current name when blank.
    #[serde(default)]
    pub name: String,
    /// MIME type; guessed from the name when blank.
    #[serde(default)]
    pub mime_type: String,
    /// Content size in bytes.
    pub size: i64,
    /// Blob key; generated when absent.
    #[serde(default)]
    pub key: Option<String>,
}

/// Manages file versions.
#[derive(Debug, Clone)]
pub struct VersionService {
    store: Arc<dyn TreeStore>,
    blobs: Arc<dyn BlobStore>,
    locks: SubtreeLocks,
}

impl VersionService {
    /// Creates a new version service.
    pub fn new(store: Arc<dyn TreeStore>, blobs: Arc<dyn BlobStore>, locks: SubtreeLocks) -> Self {
        Self {
            store,
            blobs,
            locks,
        }
    }

    /// Appends a version, returning it with a URL the content can be
    /// uploaded to.
    pub async fn create_file_version(
        &self,
        input: CreateVersionInput,
    ) -> AppResult<(FileVersion, String)> {
        if input.size < 0 {
            return Err(AppError::validation("File size cannot be negative"));
        }
        let file = self
            .store
            .find_file(input.file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {} not found", input.file_id)))?;

        let name = if input.name.trim().is_empty() {
            file.name.clone()
        } else {
            input.name
        };
        validate_name(&name)?;
        let key = upload_key(input.key.as_deref(), &name)?;
        let mime_type = resolve_mime(&input.mime_type, &name);
        let upload_url = self.blobs.put_signed_url(&key).await?;

        // The file and its chain stay put until the version row lands.
        let mut held = file.ancestors.clone();
        held.push(file.id);
        let _guard = self.locks.acquire(&[], &held).await;
        match self.store.find_file(file.id).await? {
            None => return Err(AppError::not_found(format!("File {} not found", file.id))),
            Some(current) if current.ancestors != file.ancestors => {
                return Err(AppError::conflict(format!(
                    "File {} moved while waiting for locks",
                    file.id
                )));
            }
            Some(_) => {}
        }
        let version = self
            .store
            .insert_version(&FileVersion::new(file.id, name, mime_type, input.size, &key))
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {} not found", input.file_id)))?;

        info!(
            file_id = %file.id,
            version_id = %version.id,
            key = %key,
            size = version.size,
            "File version created"
        );
        Ok((version, upload_url))
    }

    /// A page of a file's versions, newest first.
    pub async fn get_file_versions(
        &self,
        file_id: Uuid,
        page: Option<PageRequest>,
    ) -> AppResult<Vec<FileVersion>> {
        self.store
            .list_versions(file_id, &page.unwrap_or_default())
            .await
    }

    /// Gets a version by ID.
    pub async fn get_file_version(&self, id: Uuid) -> AppResult<Option<FileVersion>> {
        self.store.find_version(id).await
    }

    /// A signed URL to download the object stored under `key`.
    pub async fn request_file_download(&self, key: &str) -> AppResult<String> {
        validate_key(key)?;
        self.blobs.get_signed_url(key).await
    }
}
