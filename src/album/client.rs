//! Request boundary between the album and the outside world.
//!
//! `AlbumApi` is the proxy (upload URLs, view URLs, deletes) and `ObjectTransfer`
//! moves bytes straight to storage through a pre-signed URL. `HttpAlbumClient`
//! implements both over reqwest.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::{ClientError, ClientResult};
use crate::models::{
    DeleteRequest, DeleteResponse, ErrorResponse, UploadUrlRequest, UploadUrlResponse,
    ViewUrlRequest, ViewUrlResponse,
};

/// Receives whole-number upload percentages, non-decreasing, ending at 100.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

#[async_trait]
pub trait AlbumApi: Send + Sync {
    async fn request_upload_url(
        &self,
        file_name: &str,
        content_type: &str,
        size: u64,
    ) -> ClientResult<UploadUrlResponse>;

    async fn request_view_url(&self, key: &str) -> ClientResult<String>;

    async fn delete_object(&self, key: &str) -> ClientResult<()>;
}

#[async_trait]
pub trait ObjectTransfer: Send + Sync {
    /// PUTs `data` to a pre-signed URL. Only a success status counts as done;
    /// progress callbacks are observational.
    async fn put(
        &self,
        url: &str,
        content_type: &str,
        data: Bytes,
        progress: ProgressFn,
    ) -> ClientResult<()>;
}

pub fn percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

#[derive(Clone)]
pub struct HttpAlbumClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpAlbumClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Request(format!("Invalid server URL {}: {}", base_url, e)))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Request(format!("Invalid endpoint {}: {}", path, e)))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);

        Err(ClientError::Storage {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl AlbumApi for HttpAlbumClient {
    async fn request_upload_url(
        &self,
        file_name: &str,
        content_type: &str,
        size: u64,
    ) -> ClientResult<UploadUrlResponse> {
        let request = UploadUrlRequest {
            filename: Some(file_name.to_string()),
            content_type: Some(content_type.to_string()),
            size: Some(size),
        };

        let response = self
            .http
            .post(self.endpoint("/api/s3/upload")?)
            .json(&request)
            .send()
            .await?;

        Self::read_json(response).await
    }

    async fn request_view_url(&self, key: &str) -> ClientResult<String> {
        let request = ViewUrlRequest {
            s3_url: Some(key.to_string()),
        };

        let response = self
            .http
            .post(self.endpoint("/api/presigned-url")?)
            .json(&request)
            .send()
            .await?;

        let body: ViewUrlResponse = Self::read_json(response).await?;
        Ok(body.url)
    }

    async fn delete_object(&self, key: &str) -> ClientResult<()> {
        let request = DeleteRequest {
            key: Some(key.to_string()),
        };

        let response = self
            .http
            .delete(self.endpoint("/api/s3/delete")?)
            .json(&request)
            .send()
            .await?;

        let body: DeleteResponse = Self::read_json(response).await?;
        debug!(key, message = %body.message, "Object deleted");
        Ok(())
    }
}

#[async_trait]
impl ObjectTransfer for HttpAlbumClient {
    async fn put(
        &self,
        url: &str,
        content_type: &str,
        data: Bytes,
        progress: ProgressFn,
    ) -> ClientResult<()> {
        let total = data.len();
        let chunks: Vec<Bytes> = (0..total)
            .step_by(UPLOAD_CHUNK_SIZE)
            .map(|start| data.slice(start..(start + UPLOAD_CHUNK_SIZE).min(total)))
            .collect();

        let mut sent = 0usize;
        let tick = progress.clone();
        let body = futures::stream::iter(chunks).map(move |chunk| {
            sent += chunk.len();
            tick(percent(sent, total));
            Ok::<Bytes, std::io::Error>(chunk)
        });

        let response = self
            .http
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Upload rejected by storage");
            return Err(ClientError::Storage {
                status: status.as_u16(),
                message: if message.is_empty() {
                    format!("Upload failed with status: {}", status.as_u16())
                } else {
                    message
                },
            });
        }

        if total == 0 {
            progress(100);
        }
        Ok(())
    }
}
