// Error types shared by the HTTP handlers

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::character::Violation;
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad type/size/count or missing fields; reported inline, never sent to storage.
    #[error("{0}")]
    Validation(String),

    #[error("Invalid character")]
    InvalidCharacter(Vec<Violation>),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The storage backend failed; `message` is what the caller sees.
    #[error("{message}")]
    Storage {
        message: &'static str,
        #[source]
        source: StorageError,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn storage(message: &'static str, source: StorageError) -> Self {
        match source {
            StorageError::InvalidLocator(detail) => {
                AppError::Validation(format!("Invalid storage locator: {}", detail))
            }
            source => AppError::Storage { message, source },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCharacter(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Storage { .. } | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Storage { message, source } => {
                error!("{}: {}", message, source);
                serde_json::json!({ "error": message })
            }
            AppError::InvalidCharacter(violations) => serde_json::json!({
                "error": self.to_string(),
                "violations": violations,
            }),
            AppError::Internal(detail) => {
                error!("Internal error: {}", detail);
                serde_json::json!({ "error": "Server error" })
            }
            other => serde_json::json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
