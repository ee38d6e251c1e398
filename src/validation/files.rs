//! File Validator
//!
//! Pure checks applied to photo selections before anything touches storage:
//! count, content type, per-file size and (batch path only) aggregate size.
//! The same rules run in the upload orchestrator and in the proxy routes.

use serde::Serialize;

const MIB: u64 = 1024 * 1024;

/// Content types accepted for album photos.
pub const ALLOWED_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
];

/// Anything that looks like a selected file: name, size and declared type.
pub trait FileDescriptor {
    fn file_name(&self) -> &str;
    fn file_size(&self) -> u64;
    fn content_type(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConstraints {
    pub max_files: usize,
    pub max_file_size: u64,
    /// Aggregate cap over accepted files; `None` disables the check.
    pub max_total_size: Option<u64>,
    pub allowed_types: &'static [&'static str],
}

impl FileConstraints {
    /// Multipart batch path: 5 MiB per file, 50 MiB per batch.
    pub fn batch() -> Self {
        Self {
            max_files: 20,
            max_file_size: 5 * MIB,
            max_total_size: Some(50 * MIB),
            allowed_types: ALLOWED_TYPES,
        }
    }

    /// Direct-to-storage path: 10 MiB per file, no aggregate cap.
    pub fn direct() -> Self {
        Self {
            max_files: 20,
            max_file_size: 10 * MIB,
            max_total_size: None,
            allowed_types: ALLOWED_TYPES,
        }
    }

    /// Shrinks the count limit to the free slots left in an album holding `existing` photos.
    pub fn with_existing(&self, existing: usize) -> Self {
        Self {
            max_files: self.max_files.saturating_sub(existing),
            ..self.clone()
        }
    }

    pub fn allows_type(&self, content_type: &str) -> bool {
        let normalized = content_type.trim().to_ascii_lowercase();
        self.allowed_types.iter().any(|t| *t == normalized)
    }
}

impl Default for FileConstraints {
    fn default() -> Self {
        Self::direct()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum RejectionReason {
    TooManyFiles { max: usize, selected: usize },
    UnsupportedType { content_type: String },
    TooLarge { size: u64, max: u64 },
    TotalTooLarge { total: u64, max: u64 },
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooManyFiles { max, .. } => write!(f, "You can upload up to {} files only", max),
            Self::UnsupportedType { .. } => write!(
                f,
                "Unsupported file type. Only accepts: {}",
                ALLOWED_TYPES.join(", ")
            ),
            Self::TooLarge { max, .. } => write!(
                f,
                "File is too large. Maximum allowed is {}",
                format_file_size(*max)
            ),
            Self::TotalTooLarge { max, .. } => write!(
                f,
                "Total file size exceeds the limit ({})",
                format_file_size(*max)
            ),
        }
    }
}

impl RejectionReason {
    /// True when the reason rejects the whole selection rather than one file.
    pub fn is_batch_wide(&self) -> bool {
        matches!(self, Self::TooManyFiles { .. } | Self::TotalTooLarge { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRejection {
    /// `None` for batch-wide rejections.
    pub file_name: Option<String>,
    pub reason: RejectionReason,
}

impl FileRejection {
    pub fn message(&self) -> String {
        self.reason.to_string()
    }
}

#[derive(Debug)]
pub struct BatchValidation<F> {
    pub accepted: Vec<F>,
    pub rejected: Vec<FileRejection>,
}

impl<F> BatchValidation<F> {
    /// The batch was refused as a unit (count or aggregate size).
    pub fn is_rejected_wholesale(&self) -> bool {
        self.accepted.is_empty() && self.rejected.iter().any(|r| r.reason.is_batch_wide())
    }

    fn wholesale(reason: RejectionReason) -> Self {
        Self {
            accepted: Vec::new(),
            rejected: vec![FileRejection {
                file_name: None,
                reason,
            }],
        }
    }
}

/// Checks one file's type, then its size.
pub fn validate_file<F>(file: &F, constraints: &FileConstraints) -> Result<(), RejectionReason>
where
    F: FileDescriptor + ?Sized,
{
    if !constraints.allows_type(file.content_type()) {
        return Err(RejectionReason::UnsupportedType {
            content_type: file.content_type().to_string(),
        });
    }

    if file.file_size() > constraints.max_file_size {
        return Err(RejectionReason::TooLarge {
            size: file.file_size(),
            max: constraints.max_file_size,
        });
    }

    Ok(())
}

/// Validates a selection in order: count, per-file type and size, aggregate size.
///
/// Count and aggregate failures reject the entire batch with one combined reason;
/// per-file failures only drop the offending file.
pub fn validate_batch<F>(files: Vec<F>, constraints: &FileConstraints) -> BatchValidation<F>
where
    F: FileDescriptor,
{
    if files.len() > constraints.max_files {
        return BatchValidation::wholesale(RejectionReason::TooManyFiles {
            max: constraints.max_files,
            selected: files.len(),
        });
    }

    let mut accepted = Vec::with_capacity(files.len());
    let mut rejected = Vec::new();

    for file in files {
        match validate_file(&file, constraints) {
            Ok(()) => accepted.push(file),
            Err(reason) => rejected.push(FileRejection {
                file_name: Some(file.file_name().to_string()),
                reason,
            }),
        }
    }

    if let Some(max_total) = constraints.max_total_size {
        let total: u64 = accepted.iter().map(|f| f.file_size()).sum();
        if total > max_total {
            return BatchValidation::wholesale(RejectionReason::TotalTooLarge {
                total,
                max: max_total,
            });
        }
    }

    BatchValidation { accepted, rejected }
}

/// Human readable byte count: `0 Bytes`, `512 Bytes`, `1.5 KB`, `5 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut scaled = bytes as f64;
    while scaled >= 1024.0 && unit < UNITS.len() - 1 {
        scaled /= 1024.0;
        unit += 1;
    }

    let rounded = (scaled * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}
