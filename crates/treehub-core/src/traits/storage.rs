//! Blob store trait for pluggable file content backends.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// HTTP operation a signed URL grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignedUrlMethod {
    /// Upload the object body.
    Put,
    /// Download the object body.
    Get,
}

/// Trait for blob storage backends holding file version content.
///
/// Objects are addressed by the opaque `key` stored on each file version.
/// The tree engine never streams content itself; it hands out signed URLs
/// and removes objects once their version rows are gone.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "s3").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Issue a URL a client can upload the object for `key` to.
    async fn put_signed_url(&self, key: &str) -> AppResult<String>;

    /// Issue a URL a client can download the object for `key` from.
    async fn get_signed_url(&self, key: &str) -> AppResult<String>;

    /// Store an object body directly.
    async fn put_object(&self, key: &str, data: Bytes) -> AppResult<()>;

    /// Fetch an object body.
    async fn get_object(&self, key: &str) -> AppResult<Bytes>;

    /// Remove an object. Deleting a key that does not exist succeeds, so
    /// callers may retry freely.
    async fn delete_object(&self, key: &str) -> AppResult<()>;
}
