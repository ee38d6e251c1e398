//! Client-side photo album
//!
//! - `photo` - album records, previews and the local/remote source variant
//! - `reducer` - pure album transitions and the shared `AlbumStore`
//! - `orchestrator` - per-photo upload/delete lifecycle
//! - `resolver` - record to displayable URL
//! - `client` - request boundary to the proxy and to storage

pub mod client;
pub mod error;
pub mod orchestrator;
pub mod photo;
pub mod reducer;
pub mod resolver;

pub use client::{AlbumApi, HttpAlbumClient, ObjectTransfer, ProgressFn};
pub use error::{ClientError, ClientResult};
pub use orchestrator::{ConfirmDelete, DeleteOutcome, SelectionReport, UploadOrchestrator, UploadOutcome};
pub use photo::{PhotoId, PhotoRecord, PhotoSource, PhotoStatus, PreviewRef, SelectedFile};
pub use reducer::{reduce, AlbumEvent, AlbumSnapshot, AlbumStore};
pub use resolver::{DisplayImage, PhotoDisplayResolver, UnableToLoad};
