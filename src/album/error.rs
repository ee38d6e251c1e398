use crate::validation::FileRejection;

/// Failures seen by the client side of the album.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Rejected locally; nothing was sent anywhere.
    #[error("Validation error: {}", summarize(.0))]
    Validation(Vec<FileRejection>),

    /// Could not reach the proxy or storage at all.
    #[error("Request error: {0}")]
    Request(String),

    /// The proxy or the storage endpoint answered with a failure status.
    #[error("Storage error ({status}): {message}")]
    Storage { status: u16, message: String },

    #[error("Photo not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ClientError::Storage {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => ClientError::Request(err.to_string()),
        }
    }
}

fn summarize(rejections: &[FileRejection]) -> String {
    rejections
        .iter()
        .map(|r| match &r.file_name {
            Some(name) => format!("{}: {}", name, r.message()),
            None => r.message(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
