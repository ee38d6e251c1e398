/// Failures reported by the object store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage locator: {0}")]
    InvalidLocator(String),
}

impl From<s3::error::S3Error> for StorageError {
    fn from(err: s3::error::S3Error) -> Self {
        match err {
            s3::error::S3Error::HttpFailWithBody(404, body) => StorageError::NotFound(body),
            other => StorageError::Unavailable(other.to_string()),
        }
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
