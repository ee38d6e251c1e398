use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use tracing::{info, warn};

use crate::album::SelectedFile;
use crate::config::UploadConfig;
use crate::models::{
    AppState, BatchUploadResponse, DeleteResponse, LocatorQuery, UploadFileError, UploadedPhoto,
};
use crate::types::{AppError, AppResult};
use crate::validation::{validate_batch, FileDescriptor, RejectionReason};

const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let body_limit = body_limit(&state.config.upload);

    Router::new()
        .route("/api/upload", post(upload_files))
        .route("/api/delete", delete(delete_by_locator))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Room for a full batch of files at the per-file cap, so the count, size and
/// aggregate rules are reported by the validator rather than by the body limit.
fn body_limit(upload: &UploadConfig) -> usize {
    let largest_batch = (upload.max_files as u64).saturating_mul(upload.batch_max_file_size);
    usize::try_from(largest_batch)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD)
}

/// A body over the limit is an aggregate overflow by definition.
fn multipart_error(err: MultipartError, upload: &UploadConfig) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let reason = RejectionReason::TotalTooLarge {
            total: body_limit(upload) as u64,
            max: upload.max_total_size,
        };
        return AppError::Validation(reason.to_string());
    }
    AppError::Validation(err.body_text())
}

/// Collects every `files` part of the form. Other parts are ignored.
async fn read_files(mut multipart: Multipart, upload: &UploadConfig) -> AppResult<Vec<SelectedFile>> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, upload))?
    {
        if field.name() != Some("files") {
            continue;
        }

        let name = field.file_name().unwrap_or("upload").to_string();
        let content_type = match field.content_type() {
            Some(ct) => ct.to_string(),
            None => mime_guess::from_path(&name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, upload))?;

        files.push(SelectedFile::new(name, content_type, data));
    }

    Ok(files)
}

/// Server-side batch upload: validate, then store each accepted file in turn.
async fn upload_files(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<BatchUploadResponse>> {
    let files = read_files(multipart, &state.config.upload).await?;
    if files.is_empty() {
        return Err(AppError::Validation("No files were uploaded.".to_string()));
    }

    info!("Batch upload of {} file(s)", files.len());

    let validation = validate_batch(files, &state.config.upload.batch_constraints());
    if validation.is_rejected_wholesale() {
        let message = validation
            .rejected
            .first()
            .map(|r| r.message())
            .unwrap_or_default();
        return Err(AppError::Validation(message));
    }

    let mut errors: Vec<UploadFileError> = validation
        .rejected
        .iter()
        .map(|r| UploadFileError {
            file_name: r.file_name.clone().unwrap_or_default(),
            error: r.message(),
        })
        .collect();
    let mut uploads = Vec::with_capacity(validation.accepted.len());

    for file in validation.accepted {
        match state
            .storage
            .upload_object(&file.name, &file.content_type, &file.data)
            .await
        {
            Ok(key) => uploads.push(UploadedPhoto {
                id: uuid::Uuid::new_v4(),
                url: state.storage.locator(&key),
                file_size: file.file_size(),
                file_name: file.name,
                file_type: file.content_type,
                uploaded_at: chrono::Utc::now(),
            }),
            Err(e) => {
                warn!("File upload failed: {}: {}", file.name, e);
                errors.push(UploadFileError {
                    file_name: file.name,
                    error: "Upload failed".to_string(),
                });
            }
        }
    }

    Ok(Json(BatchUploadResponse {
        success: true,
        uploads,
        errors: if errors.is_empty() { None } else { Some(errors) },
    }))
}

/// Legacy delete addressed by a stored locator instead of a bare key.
async fn delete_by_locator(
    State(state): State<AppState>,
    Query(query): Query<LocatorQuery>,
) -> AppResult<Json<DeleteResponse>> {
    let locator = query
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Missing file URL".to_string()))?;

    state
        .storage
        .delete_object(&locator)
        .await
        .map_err(|e| AppError::storage("Failed to delete file", e))?;

    Ok(Json(DeleteResponse {
        success: true,
        message: "File deleted successfully".to_string(),
    }))
}
