//! In-memory blob store for tests and the memory backend.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use treehub_core::error::AppError;
use treehub_core::result::AppResult;
use treehub_core::traits::{BlobStore, SignedUrlMethod};

use crate::key::validate_key;
use crate::signing::UrlSigner;

/// Blob store keeping objects in a concurrent map.
#[derive(Debug, Clone)]
pub struct MemoryBlobStore {
    objects: Arc<DashMap<String, Bytes>>,
    base_url: String,
    signer: UrlSigner,
}

impl MemoryBlobStore {
    /// Create an empty store issuing URLs under `base_url`.
    pub fn new(base_url: impl Into<String>, signer: UrlSigner) -> Self {
        Self {
            objects: Arc::new(DashMap::new()),
            base_url: base_url.into(),
            signer,
        }
    }

    /// Whether an object exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn put_signed_url(&self, key: &str) -> AppResult<String> {
        validate_key(key)?;
        self.signer
            .signed_url(&self.base_url, key, SignedUrlMethod::Put)
    }

    async fn get_signed_url(&self, key: &str) -> AppResult<String> {
        validate_key(key)?;
        self.signer
            .signed_url(&self.base_url, key, SignedUrlMethod::Get)
    }

    async fn put_object(&self, key: &str, data: Bytes) -> AppResult<()> {
        validate_key(key)?;
        self.objects.insert(key.to_string(), data);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> AppResult<Bytes> {
        self.objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found(format!("Blob not found: {key}")))
    }

    async fn delete_object(&self, key: &str) -> AppResult<()> {
        self.objects.remove(key);
        Ok(())
    }
}
