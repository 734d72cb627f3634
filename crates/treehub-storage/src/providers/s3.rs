//! S3-compatible blob store using native presigned URLs.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{debug, info};

use treehub_core::config::S3StorageConfig;
use treehub_core::error::{AppError, ErrorKind};
use treehub_core::result::AppResult;
use treehub_core::traits::BlobStore;

use crate::key::validate_key;

/// Blob store backed by an S3 bucket.
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    url_ttl: Duration,
}

impl S3BlobStore {
    /// Create a store from configuration. Explicit keys take precedence over
    /// the default AWS credential chain.
    pub async fn new(config: &S3StorageConfig, url_ttl_seconds: u64) -> AppResult<Self> {
        info!(
            endpoint = %config.endpoint,
            region = %config.region,
            bucket = %config.bucket,
            "Initializing S3 blob store"
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if !config.access_key.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "treehub-config",
            ));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if !config.endpoint.is_empty() {
            builder = builder.endpoint_url(&config.endpoint).force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            url_ttl: Duration::from_secs(url_ttl_seconds),
        })
    }

    fn presigning(&self) -> AppResult<PresigningConfig> {
        PresigningConfig::expires_in(self.url_ttl).map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Invalid presign lifetime", e)
        })
    }
}

fn sdk_error(action: &str, key: &str, err: impl std::error::Error) -> AppError {
    AppError::storage(format!(
        "S3 {action} failed for {key}: {}",
        DisplayErrorContext(err)
    ))
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn provider_type(&self) -> &str {
        "s3"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok())
    }

    async fn put_signed_url(&self, key: &str) -> AppResult<String> {
        validate_key(key)?;
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(self.presigning()?)
            .await
            .map_err(|e| sdk_error("presign put", key, e))?;
        Ok(request.uri().to_string())
    }

    async fn get_signed_url(&self, key: &str) -> AppResult<String> {
        validate_key(key)?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(self.presigning()?)
            .await
            .map_err(|e| sdk_error("presign get", key, e))?;
        Ok(request.uri().to_string())
    }

    async fn put_object(&self, key: &str, data: Bytes) -> AppResult<()> {
        validate_key(key)?;
        let len = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| sdk_error("put", key, e))?;
        debug!(key, bytes = len, "Uploaded blob");
        Ok(())
    }

    async fn get_object(&self, key: &str) -> AppResult<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error("get", key, e))?;
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| sdk_error("read body", key, e))?;
        Ok(body.into_bytes())
    }

    async fn delete_object(&self, key: &str) -> AppResult<()> {
        // S3 DeleteObject succeeds for absent keys.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error("delete", key, e))?;
        Ok(())
    }
}
