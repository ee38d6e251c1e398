// Storage layer (S3-compatible)
//
// `StorageClient` is the raw object store (one impl per backend);
// `StorageGateway` adds key generation, locator normalisation, URL lifetimes
// and idempotent deletes on top of it. The gateway never retries.

pub mod error;
pub mod keys;
pub mod memory;
pub mod s3_client;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::StorageConfig;

pub use error::{StorageError, StorageResult};
pub use keys::{generate_key, normalize_key, s3_uri};
pub use memory::MemoryClient;
pub use s3_client::S3Client;

/// Low-level object operations, implemented by each backend.
#[async_trait]
pub trait StorageClient: Send + Sync {
    fn bucket(&self) -> &str;

    fn provider(&self) -> &'static str;

    async fn presign_put(&self, key: &str, content_type: &str, expires_secs: u32) -> StorageResult<String>;

    async fn presign_get(&self, key: &str, expires_secs: u32) -> StorageResult<String>;

    async fn put_object(&self, key: &str, data: &[u8], content_type: &str) -> StorageResult<()>;

    async fn delete_object(&self, key: &str) -> StorageResult<()>;

    fn public_url(&self, key: &str) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedUpload {
    pub url: String,
    pub key: String,
}

#[derive(Clone)]
pub struct StorageGateway {
    client: Arc<dyn StorageClient>,
    key_prefix: String,
    upload_url_ttl_secs: u32,
    view_url_ttl_secs: u32,
}

impl StorageGateway {
    pub fn new(client: Arc<dyn StorageClient>, config: &StorageConfig) -> Self {
        Self {
            client,
            key_prefix: config.key_prefix.clone(),
            upload_url_ttl_secs: config.upload_url_ttl_secs,
            view_url_ttl_secs: config.view_url_ttl_secs,
        }
    }

    /// Builds the backend named by `config.provider` (`s3` or `memory`).
    pub fn connect(config: &StorageConfig) -> StorageResult<Self> {
        let client: Arc<dyn StorageClient> = match config.provider.as_str() {
            "s3" => Arc::new(S3Client::new(config)?),
            "memory" => Arc::new(MemoryClient::new(config.s3_bucket.clone())),
            other => {
                return Err(StorageError::Unavailable(format!(
                    "Unsupported storage provider: {}",
                    other
                )))
            }
        };

        info!(
            provider = client.provider(),
            bucket = client.bucket(),
            prefix = %config.key_prefix,
            "Storage gateway ready"
        );
        Ok(Self::new(client, config))
    }

    pub fn provider(&self) -> &'static str {
        self.client.provider()
    }

    pub fn bucket(&self) -> &str {
        self.client.bucket()
    }

    pub fn locator(&self, key: &str) -> String {
        s3_uri(self.bucket(), key)
    }

    pub fn public_url(&self, key: &str) -> String {
        self.client.public_url(key)
    }

    pub fn normalize(&self, reference: &str) -> StorageResult<String> {
        normalize_key(reference, self.bucket())
    }

    /// Fresh key plus a short-lived write URL scoped to it. No bytes move.
    pub async fn issue_upload_url(&self, file_name: &str, content_type: &str) -> StorageResult<IssuedUpload> {
        let key = generate_key(&self.key_prefix, file_name, content_type);
        let url = self
            .client
            .presign_put(&key, content_type, self.upload_url_ttl_secs)
            .await?;

        debug!(key = %key, file_name, "Issued upload URL");
        Ok(IssuedUpload { url, key })
    }

    /// Long-lived read URL for a bare key or any fully-qualified locator.
    pub async fn issue_view_url(&self, reference: &str) -> StorageResult<String> {
        let key = self.normalize(reference)?;
        self.client.presign_get(&key, self.view_url_ttl_secs).await
    }

    /// Removes the object. A missing object counts as already deleted.
    pub async fn delete_object(&self, reference: &str) -> StorageResult<()> {
        let key = self.normalize(reference)?;
        match self.client.delete_object(&key).await {
            Ok(()) => {
                info!(key = %key, "Deleted object");
                Ok(())
            }
            Err(StorageError::NotFound(_)) => {
                debug!(key = %key, "Delete of missing object ignored");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Server-side upload used by the batch path; returns the new key.
    pub async fn upload_object(&self, file_name: &str, content_type: &str, data: &[u8]) -> StorageResult<String> {
        let key = generate_key(&self.key_prefix, file_name, content_type);
        self.client.put_object(&key, data, content_type).await?;
        info!(key = %key, size = data.len(), "Uploaded object");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> (StorageGateway, MemoryClient) {
        let client = MemoryClient::new("album-bucket");
        let config = StorageConfig {
            s3_bucket: "album-bucket".to_string(),
            ..StorageConfig::default()
        };
        (StorageGateway::new(Arc::new(client.clone()), &config), client)
    }

    #[tokio::test]
    async fn test_issue_upload_url_is_scoped_and_short_lived() {
        let (gateway, client) = gateway();

        let issued = gateway.issue_upload_url("hero.jpg", "image/jpeg").await.unwrap();

        assert!(issued.key.starts_with("character-album/"));
        assert!(issued.key.ends_with(".jpg"));
        assert!(issued.url.contains(&issued.key));
        assert!(issued.url.contains("X-Amz-Expires=3600"));
        assert_eq!(client.len().await, 0);
    }

    #[tokio::test]
    async fn test_view_url_same_for_key_and_locator() {
        let (gateway, _) = gateway();
        let key = "character-album/1-abc.png";

        let by_key = gateway.issue_view_url(key).await.unwrap();
        let by_locator = gateway.issue_view_url(&gateway.locator(key)).await.unwrap();

        assert_eq!(by_key, by_locator);
        assert!(by_key.contains("X-Amz-Expires=604800"));
    }

    #[tokio::test]
    async fn test_delete_missing_object_is_ok() {
        let (gateway, _) = gateway();
        tokio_test::assert_ok!(gateway.delete_object("character-album/never-there.png").await);
    }

    #[tokio::test]
    async fn test_upload_then_delete_by_locator() {
        let (gateway, client) = gateway();

        let key = gateway.upload_object("a.gif", "image/gif", b"GIF89a").await.unwrap();
        let stored = client.get(&key).await.unwrap();
        assert_eq!(stored.content_type, "image/gif");

        gateway.delete_object(&gateway.locator(&key)).await.unwrap();
        assert!(client.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_locator_is_rejected() {
        let (gateway, _) = gateway();
        let err = gateway.issue_view_url("   ").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidLocator(_)));
    }

    #[test]
    fn test_unknown_provider() {
        let config = StorageConfig {
            provider: "ftp".to_string(),
            ..StorageConfig::default()
        };
        assert!(StorageGateway::connect(&config).is_err());
    }
}
