// In-process object store for local development and tests

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::error::{StorageError, StorageResult};
use super::StorageClient;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

#[derive(Clone)]
pub struct MemoryClient {
    bucket: String,
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

impl MemoryClient {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    fn signed(&self, key: &str, op: &str, expires_secs: u32) -> String {
        format!(
            "memory://{}/{}?op={}&X-Amz-Expires={}",
            self.bucket, key, op, expires_secs
        )
    }
}

#[async_trait]
impl StorageClient for MemoryClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn provider(&self) -> &'static str {
        "memory"
    }

    async fn presign_put(&self, key: &str, _content_type: &str, expires_secs: u32) -> StorageResult<String> {
        Ok(self.signed(key, "put", expires_secs))
    }

    async fn presign_get(&self, key: &str, expires_secs: u32) -> StorageResult<String> {
        Ok(self.signed(key, "get", expires_secs))
    }

    async fn put_object(&self, key: &str, data: &[u8], content_type: &str) -> StorageResult<()> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data: Bytes::copy_from_slice(data),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        match self.objects.write().await.remove(key) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("memory://{}/{}", self.bucket, key)
    }
}
