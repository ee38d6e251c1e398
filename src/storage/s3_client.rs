// S3 client backed by rust-s3

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tracing::debug;

use super::error::{StorageError, StorageResult};
use super::StorageClient;
use crate::config::StorageConfig;

pub struct S3Client {
    bucket: Box<Bucket>,
    region: String,
    endpoint: Option<String>,
}

impl S3Client {
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        if config.s3_bucket.is_empty() {
            return Err(StorageError::Unavailable(
                "AWS_S3_BUCKET_NAME must be set for the s3 provider".to_string(),
            ));
        }

        let region = match &config.s3_endpoint {
            Some(endpoint) => Region::Custom {
                region: config.s3_region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config.s3_region.parse::<Region>().map_err(|e| {
                StorageError::Unavailable(format!("Invalid region {}: {}", config.s3_region, e))
            })?,
        };

        let credentials = Credentials::new(
            config.s3_access_key_id.as_deref(),
            config.s3_secret_access_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Unavailable(format!("Failed to load credentials: {}", e)))?;

        let mut bucket = Bucket::new(&config.s3_bucket, region, credentials)?;
        if config.s3_endpoint.is_some() {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket: Box::new(bucket),
            region: config.s3_region.clone(),
            endpoint: config.s3_endpoint.clone(),
        })
    }
}

#[async_trait]
impl StorageClient for S3Client {
    fn bucket(&self) -> &str {
        &self.bucket.name
    }

    fn provider(&self) -> &'static str {
        "s3"
    }

    async fn presign_put(&self, key: &str, _content_type: &str, expires_secs: u32) -> StorageResult<String> {
        let url = self.bucket.presign_put(key, expires_secs, None).await?;
        debug!(key, expires_secs, "Presigned PUT");
        Ok(url)
    }

    async fn presign_get(&self, key: &str, expires_secs: u32) -> StorageResult<String> {
        let url = self.bucket.presign_get(key, expires_secs, None).await?;
        debug!(key, expires_secs, "Presigned GET");
        Ok(url)
    }

    async fn put_object(&self, key: &str, data: &[u8], content_type: &str) -> StorageResult<()> {
        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await?;
        debug!(key, status = response.status_code(), "PutObject");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let response = self.bucket.delete_object(key).await?;
        match response.status_code() {
            404 => Err(StorageError::NotFound(key.to_string())),
            status if (200..300).contains(&status) => Ok(()),
            status => Err(StorageError::Unavailable(format!(
                "DeleteObject returned status {}",
                status
            ))),
        }
    }

    fn public_url(&self, key: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket.name, key),
            None => format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket.name, self.region, key),
        }
    }
}
