//! Direct-to-storage endpoints
//!
//! - `POST /api/s3/upload` - pre-signed PUT URL + key for one file
//! - `POST /api/presigned-url` - pre-signed GET URL for a key or locator
//! - `DELETE /api/s3/delete` - delete by key

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{delete, post},
    Json, Router,
};
use tracing::info;

use crate::models::{
    AppState, DeleteRequest, DeleteResponse, UploadUrlRequest, UploadUrlResponse, ViewUrlRequest,
    ViewUrlResponse,
};
use crate::types::{AppError, AppResult};
use crate::validation::{format_file_size, validate_file, FileDescriptor, RejectionReason};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/s3/upload", post(issue_upload_url))
        .route("/api/presigned-url", post(issue_view_url))
        .route("/api/s3/delete", delete(delete_by_key))
        .with_state(state)
}

/// What the client says about a file it is about to upload.
struct DeclaredFile<'a> {
    name: &'a str,
    size: u64,
    content_type: &'a str,
}

impl FileDescriptor for DeclaredFile<'_> {
    fn file_name(&self) -> &str {
        self.name
    }

    fn file_size(&self) -> u64 {
        self.size
    }

    fn content_type(&self) -> &str {
        self.content_type
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn issue_upload_url(
    State(state): State<AppState>,
    payload: Result<Json<UploadUrlRequest>, JsonRejection>,
) -> AppResult<Json<UploadUrlResponse>> {
    let Json(request) = payload?;

    let (filename, content_type) = match (non_empty(request.filename), non_empty(request.content_type)) {
        (Some(filename), Some(content_type)) => (filename, content_type),
        _ => return Err(AppError::Validation("Missing filename or contentType".to_string())),
    };

    let declared = DeclaredFile {
        name: &filename,
        size: request.size.unwrap_or(0),
        content_type: &content_type,
    };
    match validate_file(&declared, &state.config.upload.direct_constraints()) {
        Ok(()) => {}
        Err(RejectionReason::TooLarge { max, .. }) => {
            return Err(AppError::Validation(format!(
                "File size exceeds {} limit",
                format_file_size(max)
            )))
        }
        Err(reason) => return Err(AppError::Validation(reason.to_string())),
    }

    let issued = state
        .storage
        .issue_upload_url(&filename, &content_type)
        .await
        .map_err(|e| AppError::storage("Failed to generate presigned URL", e))?;

    info!(key = %issued.key, filename = %filename, "Upload URL issued");

    Ok(Json(UploadUrlResponse {
        presigned_url: issued.url,
        key: issued.key,
    }))
}

async fn issue_view_url(
    State(state): State<AppState>,
    payload: Result<Json<ViewUrlRequest>, JsonRejection>,
) -> AppResult<Json<ViewUrlResponse>> {
    let Json(request) = payload?;
    let reference = non_empty(request.s3_url)
        .ok_or_else(|| AppError::Validation("Missing S3 URL".to_string()))?;

    let url = state
        .storage
        .issue_view_url(&reference)
        .await
        .map_err(|e| AppError::storage("Failed to generate URL", e))?;

    Ok(Json(ViewUrlResponse { success: true, url }))
}

async fn delete_by_key(
    State(state): State<AppState>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> AppResult<Json<DeleteResponse>> {
    let Json(request) = payload?;
    let key = non_empty(request.key).ok_or_else(|| AppError::Validation("Missing S3 key".to_string()))?;

    state
        .storage
        .delete_object(&key)
        .await
        .map_err(|e| AppError::storage("Failed to delete file", e))?;

    Ok(Json(DeleteResponse {
        success: true,
        message: "File deleted successfully".to_string(),
    }))
}
