//! Builds the configured blob store.

use std::sync::Arc;

use tracing::info;

use treehub_core::config::{StorageConfig, StorageProviderKind};
use treehub_core::result::AppResult;
use treehub_core::traits::BlobStore;

use crate::providers::{LocalBlobStore, MemoryBlobStore};
use crate::signing::UrlSigner;

/// Open the blob store selected by `config.provider`.
pub async fn open_blob_store(config: &StorageConfig) -> AppResult<Arc<dyn BlobStore>> {
    let signer = UrlSigner::new(&config.signing_secret, config.url_ttl_seconds);
    let store: Arc<dyn BlobStore> = match config.provider {
        StorageProviderKind::Local => Arc::new(LocalBlobStore::new(&config.local, signer).await?),
        StorageProviderKind::Memory => Arc::new(MemoryBlobStore::new(
            config.local.public_base_url.clone(),
            signer,
        )),
        StorageProviderKind::S3 => open_s3(config).await?,
    };
    info!(provider = store.provider_type(), "Blob store ready");
    Ok(store)
}

#[cfg(feature = "s3")]
async fn open_s3(config: &StorageConfig) -> AppResult<Arc<dyn BlobStore>> {
    let store = crate::providers::s3::S3BlobStore::new(&config.s3, config.url_ttl_seconds).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "s3"))]
async fn open_s3(_config: &StorageConfig) -> AppResult<Arc<dyn BlobStore>> {
    Err(treehub_core::AppError::not_implemented(
        "S3 blob store requires the `s3` feature",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_opens_memory_store() {
        let config = StorageConfig {
            provider: StorageProviderKind::Memory,
            ..StorageConfig::default()
        };
        let store = open_blob_store(&config).await.unwrap();
        assert_eq!(store.provider_type(), "memory");
    }
}
