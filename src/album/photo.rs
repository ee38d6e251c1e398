use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::FileDescriptor;

pub type PhotoId = Uuid;

/// Process-local handle on the original bytes of a selected file, used for
/// immediate previews. Never serialized; dropping the last clone frees the bytes.
#[derive(Clone)]
pub struct PreviewRef {
    id: Uuid,
    data: Bytes,
}

impl PreviewRef {
    pub fn new(data: Bytes) -> Self {
        Self {
            id: Uuid::new_v4(),
            data,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// Opaque URL understood only inside this process.
    pub fn url(&self) -> String {
        format!("blob:local/{}", self.id)
    }
}

impl std::fmt::Debug for PreviewRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewRef")
            .field("id", &self.id)
            .field("len", &self.data.len())
            .finish()
    }
}

impl PartialEq for PreviewRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Where a photo's pixels come from when it is rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoSource {
    Local(PreviewRef),
    Remote(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoStatus {
    Pending,
    Uploading,
    Succeeded,
    Failed,
    Deleting,
}

/// One album entry. The flat flags mirror the wire shape; `status()` derives
/// the lifecycle state from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    pub id: PhotoId,
    /// Storage object key; empty until the upload has succeeded.
    #[serde(default)]
    pub key: String,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    #[serde(skip)]
    pub local_preview: Option<PreviewRef>,
    #[serde(default)]
    pub uploading: bool,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub deleting: bool,
}

impl PhotoRecord {
    pub fn pending(
        file_name: String,
        file_size: u64,
        file_type: String,
        local_preview: Option<PreviewRef>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: String::new(),
            file_name,
            file_size,
            file_type,
            local_preview,
            uploading: false,
            progress: 0,
            error: false,
            deleting: false,
        }
    }

    pub fn status(&self) -> PhotoStatus {
        if self.deleting {
            PhotoStatus::Deleting
        } else if self.uploading {
            PhotoStatus::Uploading
        } else if self.error {
            PhotoStatus::Failed
        } else if !self.key.is_empty() && self.progress == 100 {
            PhotoStatus::Succeeded
        } else {
            PhotoStatus::Pending
        }
    }

    /// Local preview wins; otherwise the stored key; otherwise nothing to show.
    pub fn source(&self) -> Option<PhotoSource> {
        if let Some(preview) = &self.local_preview {
            return Some(PhotoSource::Local(preview.clone()));
        }
        if !self.key.is_empty() {
            return Some(PhotoSource::Remote(self.key.clone()));
        }
        None
    }
}

/// A file picked by the user, with its bytes already in memory.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

impl FileDescriptor for SelectedFile {
    fn file_name(&self) -> &str {
        &self.name
    }

    fn file_size(&self) -> u64 {
        self.data.len() as u64
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }
}
