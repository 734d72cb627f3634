//! Local filesystem blob store.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;

use treehub_core::config::LocalStorageConfig;
use treehub_core::error::{AppError, ErrorKind};
use treehub_core::result::AppResult;
use treehub_core::traits::{BlobStore, SignedUrlMethod};

use crate::key::validate_key;
use crate::signing::UrlSigner;

/// Blob store writing one file per key under a root directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    /// Root directory for all stored objects.
    root: PathBuf,
    /// Base URL the `/blobs/*` route is served under.
    public_base_url: String,
    signer: UrlSigner,
}

impl LocalBlobStore {
    /// Create a store rooted at `config.root_path`, creating it if needed.
    pub async fn new(config: &LocalStorageConfig, signer: UrlSigner) -> AppResult<Self> {
        let root = PathBuf::from(&config.root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create blob root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self {
            root,
            public_base_url: config.public_base_url.clone(),
            signer,
        })
    }

    /// Resolve a validated key to its path within the root.
    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn put_signed_url(&self, key: &str) -> AppResult<String> {
        validate_key(key)?;
        self.signer
            .signed_url(&self.public_base_url, key, SignedUrlMethod::Put)
    }

    async fn get_signed_url(&self, key: &str) -> AppResult<String> {
        validate_key(key)?;
        self.signer
            .signed_url(&self.public_base_url, key, SignedUrlMethod::Get)
    }

    async fn put_object(&self, key: &str, data: Bytes) -> AppResult<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        fs::write(&path, &data).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to write blob: {key}"), e)
        })?;
        debug!(key, bytes = data.len(), "Wrote blob");
        Ok(())
    }

    async fn get_object(&self, key: &str) -> AppResult<Bytes> {
        let path = self.resolve(key)?;
        let data = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Blob not found: {key}"))
            } else {
                AppError::with_source(ErrorKind::Storage, format!("Failed to read blob: {key}"), e)
            }
        })?;
        Ok(Bytes::from(data))
    }

    async fn delete_object(&self, key: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key, "Deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete blob: {key}"),
                e,
            )),
        }
    }
}
