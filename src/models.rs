use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::storage::{StorageGateway, StorageResult};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: StorageGateway,
}

impl AppState {
    pub fn new(config: Config) -> StorageResult<Self> {
        let storage = StorageGateway::connect(&config.storage)?;
        Ok(Self { config, storage })
    }
}

// API Request/Response types. Field names are camelCase on the wire.

/// `POST /api/s3/upload`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    #[serde(alias = "fileName", skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub presigned_url: String,
    pub key: String,
}

/// `POST /api/presigned-url`; `reference` is accepted as an alias of `s3Url`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewUrlRequest {
    #[serde(alias = "reference", skip_serializing_if = "Option::is_none")]
    pub s3_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewUrlResponse {
    pub success: bool,
    pub url: String,
}

/// `DELETE /api/s3/delete`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub key: Option<String>,
}

/// `DELETE /api/delete?url=<locator>`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocatorQuery {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// One stored file from `POST /api/upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedPhoto {
    pub id: uuid::Uuid,
    /// `s3://bucket/key` locator.
    pub url: String,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileError {
    pub file_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchUploadResponse {
    pub success: bool,
    pub uploads: Vec<UploadedPhoto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<UploadFileError>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitCharacterResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub storage: String,
}
