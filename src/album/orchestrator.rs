//! Upload Orchestrator
//!
//! Drives each photo through `Pending -> Uploading -> Succeeded | Failed`:
//! validate the selection, add pending records with local previews, ask the
//! proxy for a pre-signed URL, PUT the bytes straight to storage, and report
//! progress. Uploads run concurrently; every state change goes through
//! `AlbumStore::dispatch`. Nothing is retried automatically.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use super::client::{AlbumApi, ObjectTransfer, ProgressFn};
use super::error::{ClientError, ClientResult};
use super::photo::{PhotoId, PhotoRecord, PhotoStatus, PreviewRef, SelectedFile};
use super::reducer::{AlbumEvent, AlbumSnapshot, AlbumStore};
use crate::validation::{validate_batch, FileConstraints, FileRejection};

/// Blocking "are you sure?" prompt shown before a delete.
pub trait ConfirmDelete: Send + Sync {
    fn confirm(&self, photo: &PhotoRecord) -> bool;
}

impl<F> ConfirmDelete for F
where
    F: Fn(&PhotoRecord) -> bool + Send + Sync,
{
    fn confirm(&self, photo: &PhotoRecord) -> bool {
        self(photo)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub id: PhotoId,
    pub file_name: String,
    pub status: PhotoStatus,
    pub key: Option<String>,
    pub error: Option<String>,
}

/// Result of one selection: per-file rejections plus the terminal state of
/// every accepted file.
#[derive(Debug, Clone, Default)]
pub struct SelectionReport {
    pub rejected: Vec<FileRejection>,
    pub outcomes: Vec<UploadOutcome>,
}

impl SelectionReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == PhotoStatus::Succeeded)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == PhotoStatus::Failed)
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

pub struct UploadOrchestrator {
    store: AlbumStore,
    api: Arc<dyn AlbumApi>,
    transfer: Arc<dyn ObjectTransfer>,
    constraints: FileConstraints,
}

impl UploadOrchestrator {
    pub fn new(
        store: AlbumStore,
        api: Arc<dyn AlbumApi>,
        transfer: Arc<dyn ObjectTransfer>,
        constraints: FileConstraints,
    ) -> Self {
        Self {
            store,
            api,
            transfer,
            constraints,
        }
    }

    pub fn store(&self) -> &AlbumStore {
        &self.store
    }

    pub fn album(&self) -> AlbumSnapshot {
        self.store.snapshot()
    }

    /// Validates the selection against the album's free slots and, if anything
    /// survives, uploads all accepted files concurrently.
    ///
    /// A wholesale rejection (too many files) returns `ClientError::Validation`
    /// before any record is created or any request is sent.
    pub async fn select_files(&self, files: Vec<SelectedFile>) -> ClientResult<SelectionReport> {
        let constraints = self.constraints.with_existing(self.store.len());
        let checked = validate_batch(files, &constraints);

        if checked.is_rejected_wholesale() {
            warn!(reason = %checked.rejected[0].message(), "Selection rejected");
            return Err(ClientError::Validation(checked.rejected));
        }
        for rejection in &checked.rejected {
            warn!(
                file = rejection.file_name.as_deref().unwrap_or_default(),
                reason = %rejection.message(),
                "File rejected"
            );
        }

        let mut pending = Vec::with_capacity(checked.accepted.len());
        let mut records = Vec::with_capacity(checked.accepted.len());
        for file in checked.accepted {
            let preview = PreviewRef::new(file.data.clone());
            let record = PhotoRecord::pending(
                file.name.clone(),
                file.data.len() as u64,
                file.content_type.clone(),
                Some(preview),
            );
            pending.push((record.id, file));
            records.push(record);
        }
        self.store.dispatch(AlbumEvent::Added(records));

        let outcomes = join_all(
            pending
                .into_iter()
                .map(|(id, file)| self.upload(id, file)),
        )
        .await;

        Ok(SelectionReport {
            rejected: checked.rejected,
            outcomes,
        })
    }

    /// User-initiated re-attempt of a failed photo with its original bytes.
    pub async fn retry(&self, id: PhotoId, file: SelectedFile) -> ClientResult<UploadOutcome> {
        let record = self
            .store
            .get(id)
            .ok_or_else(|| ClientError::NotFound(id.to_string()))?;

        if record.status() != PhotoStatus::Failed {
            return Err(ClientError::Request(format!(
                "Photo {} is {:?}, only failed uploads can be retried",
                id,
                record.status()
            )));
        }

        Ok(self.upload(id, file).await)
    }

    async fn upload(&self, id: PhotoId, file: SelectedFile) -> UploadOutcome {
        self.store.dispatch(AlbumEvent::UploadStarted { id });
        debug!(photo_id = %id, file = %file.name, "Upload started");

        let error = match self.transfer_file(id, &file).await {
            Ok(key) => {
                self.store.dispatch(AlbumEvent::UploadSucceeded {
                    id,
                    key: key.clone(),
                });
                info!(photo_id = %id, key = %key, "Upload finished");
                None
            }
            Err(e) => {
                self.store.dispatch(AlbumEvent::UploadFailed { id });
                error!(photo_id = %id, file = %file.name, "Upload failed: {}", e);
                Some(e.to_string())
            }
        };

        let record = self.store.get(id);
        UploadOutcome {
            id,
            file_name: file.name,
            status: record
                .as_ref()
                .map(|r| r.status())
                .unwrap_or(PhotoStatus::Failed),
            key: record.map(|r| r.key).filter(|k| !k.is_empty()),
            error,
        }
    }

    async fn transfer_file(&self, id: PhotoId, file: &SelectedFile) -> ClientResult<String> {
        let issued = self
            .api
            .request_upload_url(&file.name, &file.content_type, file.data.len() as u64)
            .await?;

        let store = self.store.clone();
        let progress: ProgressFn = Arc::new(move |percent| {
            store.dispatch(AlbumEvent::Progress { id, percent });
        });

        self.transfer
            .put(
                &issued.presigned_url,
                &file.content_type,
                file.data.clone(),
                progress,
            )
            .await?;

        Ok(issued.key)
    }

    /// Deletes a photo after confirmation. On success the record leaves the
    /// album and its preview is released; on failure it stays, flagged as error.
    /// Photos still pending or uploading are refused without prompting.
    pub async fn delete(
        &self,
        id: PhotoId,
        confirm: &dyn ConfirmDelete,
    ) -> ClientResult<DeleteOutcome> {
        let record = self
            .store
            .get(id)
            .ok_or_else(|| ClientError::NotFound(id.to_string()))?;

        // The key is only known once the transfer finishes; deleting now would
        // orphan the stored object.
        if matches!(record.status(), PhotoStatus::Pending | PhotoStatus::Uploading) {
            return Err(ClientError::Request(format!(
                "Photo {} is still uploading and cannot be deleted yet",
                id
            )));
        }

        if !confirm.confirm(&record) {
            return Ok(DeleteOutcome::Cancelled);
        }

        self.store.dispatch(AlbumEvent::DeleteStarted { id });

        // Never stored (failed or still pending): nothing to delete remotely.
        if record.key.is_empty() {
            self.store.dispatch(AlbumEvent::Removed { id });
            debug!(photo_id = %id, "Removed photo without stored object");
            return Ok(DeleteOutcome::Deleted);
        }

        match self.api.delete_object(&record.key).await {
            Ok(()) => {
                self.store.dispatch(AlbumEvent::Removed { id });
                info!(photo_id = %id, key = %record.key, "Photo deleted");
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => {
                self.store.dispatch(AlbumEvent::DeleteFailed { id });
                error!(photo_id = %id, key = %record.key, "Delete failed: {}", e);
                Err(e)
            }
        }
    }

    /// Drops every local preview; in-flight transfers keep running.
    pub fn release_previews(&self) {
        self.store.dispatch(AlbumEvent::PreviewsReleased);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UploadUrlResponse;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    const MIB: usize = 1024 * 1024;

    #[derive(Default)]
    struct FakeApi {
        upload_url_calls: AtomicUsize,
        deletes: Mutex<Vec<String>>,
        fail_upload_url: bool,
        fail_delete: bool,
    }

    #[async_trait]
    impl AlbumApi for FakeApi {
        async fn request_upload_url(
            &self,
            file_name: &str,
            _content_type: &str,
            _size: u64,
        ) -> ClientResult<UploadUrlResponse> {
            let n = self.upload_url_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_upload_url {
                return Err(ClientError::Storage {
                    status: 500,
                    message: "Failed to generate presigned URL".into(),
                });
            }
            Ok(UploadUrlResponse {
                presigned_url: format!("memory://put/{}", file_name),
                key: format!("character-album/{}-{}", n, file_name),
            })
        }

        async fn request_view_url(&self, key: &str) -> ClientResult<String> {
            Ok(format!("memory://get/{}", key))
        }

        async fn delete_object(&self, key: &str) -> ClientResult<()> {
            if self.fail_delete {
                return Err(ClientError::Request("connection reset".into()));
            }
            self.deletes.lock().unwrap().push(key.to_string());
            Ok(())
        }
    }

    /// Reports progress in quarters, yielding between steps so uploads interleave.
    /// With a `hold`, the transfer stalls at 50% until notified.
    #[derive(Default)]
    struct FakeTransfer {
        failing: HashSet<String>,
        puts: AtomicUsize,
        hold: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl ObjectTransfer for FakeTransfer {
        async fn put(
            &self,
            url: &str,
            _content_type: &str,
            _data: Bytes,
            progress: ProgressFn,
        ) -> ClientResult<()> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            for p in [25, 50, 75] {
                progress(p);
                if p == 50 {
                    if let Some(hold) = &self.hold {
                        hold.notified().await;
                    }
                }
                tokio::task::yield_now().await;
            }
            if self.failing.iter().any(|name| url.ends_with(name.as_str())) {
                return Err(ClientError::Request("transport error".into()));
            }
            progress(100);
            Ok(())
        }
    }

    fn jpeg(name: &str, size: usize) -> SelectedFile {
        SelectedFile::new(name, "image/jpeg", vec![0u8; size])
    }

    fn orchestrator(api: FakeApi, transfer: FakeTransfer) -> (UploadOrchestrator, Arc<FakeApi>, Arc<FakeTransfer>) {
        let api = Arc::new(api);
        let transfer = Arc::new(transfer);
        let orch = UploadOrchestrator::new(
            AlbumStore::default(),
            api.clone(),
            transfer.clone(),
            FileConstraints::direct(),
        );
        (orch, api, transfer)
    }

    #[tokio::test]
    async fn test_three_jpegs_all_succeed() {
        let (orch, _, _) = orchestrator(FakeApi::default(), FakeTransfer::default());
        let files = vec![jpeg("a.jpg", MIB), jpeg("b.jpg", MIB), jpeg("c.jpg", MIB)];

        let report = orch.select_files(files).await.unwrap();

        assert_eq!(report.succeeded(), 3);
        let album = orch.album();
        assert_eq!(album.len(), 3);
        for photo in album.iter() {
            assert!(!photo.uploading);
            assert_eq!(photo.progress, 100);
            assert!(!photo.error);
            assert!(!photo.key.is_empty());
        }
    }

    #[tokio::test]
    async fn test_transport_failure_marks_only_that_photo() {
        let transfer = FakeTransfer {
            failing: ["b.jpg".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let (orch, _, _) = orchestrator(FakeApi::default(), transfer);

        let report = orch
            .select_files(vec![jpeg("a.jpg", 10), jpeg("b.jpg", 10)])
            .await
            .unwrap();

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);

        let album = orch.album();
        let failed = album.iter().find(|p| p.file_name == "b.jpg").unwrap();
        assert!(!failed.uploading);
        assert_eq!(failed.progress, 0);
        assert!(failed.error);
        assert!(failed.key.is_empty());

        let ok = album.iter().find(|p| p.file_name == "a.jpg").unwrap();
        assert_eq!(ok.status(), PhotoStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_upload_url_failure_skips_transfer() {
        let api = FakeApi {
            fail_upload_url: true,
            ..Default::default()
        };
        let (orch, _, transfer) = orchestrator(api, FakeTransfer::default());

        let report = orch.select_files(vec![jpeg("a.jpg", 10)]).await.unwrap();

        assert_eq!(report.failed(), 1);
        assert_eq!(transfer.puts.load(Ordering::SeqCst), 0);
        assert!(orch.album()[0].error);
    }

    #[tokio::test]
    async fn test_unsupported_type_rejected_before_network() {
        let (orch, api, _) = orchestrator(FakeApi::default(), FakeTransfer::default());

        let report = orch
            .select_files(vec![SelectedFile::new("notes.txt", "text/plain", "hello")])
            .await
            .unwrap();

        assert!(report.outcomes.is_empty());
        assert_eq!(report.rejected.len(), 1);
        assert!(report.rejected[0].message().starts_with("Unsupported file type"));
        assert_eq!(api.upload_url_calls.load(Ordering::SeqCst), 0);
        assert!(orch.album().is_empty());
    }

    #[tokio::test]
    async fn test_twenty_one_files_rejected_wholesale() {
        let (orch, api, _) = orchestrator(FakeApi::default(), FakeTransfer::default());
        let files: Vec<_> = (0..21).map(|i| jpeg(&format!("{i}.jpg"), 10)).collect();

        let err = orch.select_files(files).await.unwrap_err();

        match err {
            ClientError::Validation(rejected) => {
                assert_eq!(rejected.len(), 1);
                assert!(rejected[0].message().contains("up to 20 files"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(api.upload_url_calls.load(Ordering::SeqCst), 0);
        assert!(orch.album().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_uploads_lose_no_updates() {
        let (orch, _, _) = orchestrator(FakeApi::default(), FakeTransfer::default());
        let files: Vec<_> = (0..12).map(|i| jpeg(&format!("{i}.jpg"), 100)).collect();

        orch.select_files(files).await.unwrap();

        let album = orch.album();
        assert_eq!(album.len(), 12);
        assert!(album.iter().all(|p| p.status() == PhotoStatus::Succeeded));
        let keys: HashSet<_> = album.iter().map(|p| p.key.clone()).collect();
        assert_eq!(keys.len(), 12);
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_that_photo() {
        let (orch, api, _) = orchestrator(FakeApi::default(), FakeTransfer::default());
        orch.select_files(vec![jpeg("a.jpg", 10), jpeg("b.jpg", 10), jpeg("c.jpg", 10)])
            .await
            .unwrap();
        let target = orch.album()[1].clone();

        let outcome = orch.delete(target.id, &|_: &PhotoRecord| true).await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Deleted);
        let album = orch.album();
        assert_eq!(album.len(), 2);
        assert!(album.iter().all(|p| p.id != target.id));
        assert_eq!(*api.deletes.lock().unwrap(), vec![target.key]);
    }

    #[tokio::test]
    async fn test_delete_cancelled_keeps_photo() {
        let (orch, api, _) = orchestrator(FakeApi::default(), FakeTransfer::default());
        orch.select_files(vec![jpeg("a.jpg", 10)]).await.unwrap();
        let id = orch.album()[0].id;

        let outcome = orch.delete(id, &|_: &PhotoRecord| false).await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Cancelled);
        assert_eq!(orch.album().len(), 1);
        assert!(api.deletes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_restores_error_state() {
        let api = FakeApi {
            fail_delete: true,
            ..Default::default()
        };
        let (orch, _, _) = orchestrator(api, FakeTransfer::default());
        orch.select_files(vec![jpeg("a.jpg", 10)]).await.unwrap();
        let id = orch.album()[0].id;

        assert!(orch.delete(id, &|_: &PhotoRecord| true).await.is_err());

        let photo = orch.store().get(id).unwrap();
        assert!(!photo.deleting);
        assert!(photo.error);
        assert_eq!(photo.status(), PhotoStatus::Failed);
    }

    #[tokio::test]
    async fn test_delete_refused_while_uploading() {
        let hold = Arc::new(Notify::new());
        let transfer = FakeTransfer {
            hold: Some(hold.clone()),
            ..Default::default()
        };
        let (orch, api, _) = orchestrator(FakeApi::default(), transfer);

        let (report, deleted) = tokio::join!(orch.select_files(vec![jpeg("a.jpg", 10)]), async {
            while orch.album().first().map(|p| p.progress) != Some(50) {
                tokio::task::yield_now().await;
            }
            let id = orch.album()[0].id;
            let result = orch.delete(id, &|_: &PhotoRecord| true).await;
            hold.notify_one();
            result
        });

        assert!(matches!(deleted, Err(ClientError::Request(_))));
        let report = report.unwrap();
        assert_eq!(report.succeeded(), 1);

        let album = orch.album();
        assert_eq!(album.len(), 1);
        assert_eq!(album[0].status(), PhotoStatus::Succeeded);
        assert!(!album[0].deleting);
        assert!(api.deletes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retry_after_failure() {
        let transfer = FakeTransfer {
            failing: ["a.jpg".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let (orch, _, _) = orchestrator(FakeApi::default(), transfer);
        orch.select_files(vec![jpeg("a.jpg", 10)]).await.unwrap();
        let id = orch.album()[0].id;

        // Same bytes under a new name so the fake transfer lets it through.
        let outcome = orch.retry(id, jpeg("a2.jpg", 10)).await.unwrap();

        assert_eq!(outcome.status, PhotoStatus::Succeeded);
        assert!(outcome.key.is_some());
    }

    #[tokio::test]
    async fn test_retry_rejects_successful_photo() {
        let (orch, _, _) = orchestrator(FakeApi::default(), FakeTransfer::default());
        orch.select_files(vec![jpeg("a.jpg", 10)]).await.unwrap();
        let id = orch.album()[0].id;

        assert!(orch.retry(id, jpeg("a.jpg", 10)).await.is_err());
    }

    #[tokio::test]
    async fn test_release_previews() {
        let (orch, _, _) = orchestrator(FakeApi::default(), FakeTransfer::default());
        orch.select_files(vec![jpeg("a.jpg", 10)]).await.unwrap();
        assert!(orch.album()[0].local_preview.is_some());

        orch.release_previews();

        assert!(orch.album()[0].local_preview.is_none());
    }
}
