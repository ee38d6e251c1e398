//! Album state as a reducer.
//!
//! The album is never edited in place. Every change is an `AlbumEvent` that
//! `reduce` turns into a fresh album from the *current* one, and `AlbumStore`
//! applies it inside `watch::Sender::send_modify`, so concurrent uploads always
//! build on the latest snapshot instead of one captured earlier.

use std::sync::Arc;

use tokio::sync::watch;

use super::photo::{PhotoId, PhotoRecord};
use crate::character::MAX_ALBUM_PHOTOS;

pub type AlbumSnapshot = Arc<Vec<PhotoRecord>>;

#[derive(Debug, Clone, PartialEq)]
pub enum AlbumEvent {
    /// New pending records, appended in selection order.
    Added(Vec<PhotoRecord>),
    UploadStarted { id: PhotoId },
    Progress { id: PhotoId, percent: u8 },
    UploadSucceeded { id: PhotoId, key: String },
    UploadFailed { id: PhotoId },
    DeleteStarted { id: PhotoId },
    DeleteFailed { id: PhotoId },
    Removed { id: PhotoId },
    /// Drop every local preview reference (album view torn down).
    PreviewsReleased,
}

/// Pure transition: `(current album, event) -> new album`. Events naming an
/// unknown photo leave the album unchanged.
pub fn reduce(album: &[PhotoRecord], event: &AlbumEvent) -> Vec<PhotoRecord> {
    match event {
        AlbumEvent::Added(records) => {
            let room = MAX_ALBUM_PHOTOS.saturating_sub(album.len());
            album
                .iter()
                .cloned()
                .chain(records.iter().take(room).cloned())
                .collect()
        }
        AlbumEvent::UploadStarted { id } => update(album, *id, |p| {
            p.uploading = true;
            p.error = false;
            p.progress = 0;
            p.key.clear();
        }),
        AlbumEvent::Progress { id, percent } => update(album, *id, |p| {
            if p.uploading {
                p.progress = p.progress.max((*percent).min(100));
            }
        }),
        AlbumEvent::UploadSucceeded { id, key } => update(album, *id, |p| {
            p.uploading = false;
            p.progress = 100;
            p.error = false;
            p.key = key.clone();
        }),
        AlbumEvent::UploadFailed { id } => update(album, *id, |p| {
            p.uploading = false;
            p.progress = 0;
            p.error = true;
            p.key.clear();
        }),
        AlbumEvent::DeleteStarted { id } => update(album, *id, |p| p.deleting = true),
        AlbumEvent::DeleteFailed { id } => update(album, *id, |p| {
            p.deleting = false;
            p.error = true;
        }),
        AlbumEvent::Removed { id } => album.iter().filter(|p| p.id != *id).cloned().collect(),
        AlbumEvent::PreviewsReleased => album
            .iter()
            .cloned()
            .map(|mut p| {
                p.local_preview = None;
                p
            })
            .collect(),
    }
}

fn update(album: &[PhotoRecord], id: PhotoId, apply: impl Fn(&mut PhotoRecord)) -> Vec<PhotoRecord> {
    album
        .iter()
        .cloned()
        .map(|mut p| {
            if p.id == id {
                apply(&mut p);
            }
            p
        })
        .collect()
}

/// Owner of the album. Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct AlbumStore {
    tx: Arc<watch::Sender<AlbumSnapshot>>,
}

impl AlbumStore {
    pub fn new(initial: Vec<PhotoRecord>) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx: Arc::new(tx) }
    }

    /// Applies `event` to the album as it is right now and returns the result.
    pub fn dispatch(&self, event: AlbumEvent) -> AlbumSnapshot {
        self.tx.send_modify(|album| {
            *album = Arc::new(reduce(album, &event));
        });
        self.snapshot()
    }

    pub fn snapshot(&self) -> AlbumSnapshot {
        self.tx.borrow().clone()
    }

    pub fn get(&self, id: PhotoId) -> Option<PhotoRecord> {
        self.tx.borrow().iter().find(|p| p.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        MAX_ALBUM_PHOTOS
    }

    /// Receiver notified after every applied event.
    pub fn subscribe(&self) -> watch::Receiver<AlbumSnapshot> {
        self.tx.subscribe()
    }
}

impl Default for AlbumStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::album::photo::PhotoStatus;

    fn photo(name: &str) -> PhotoRecord {
        PhotoRecord::pending(name.to_string(), 1024, "image/jpeg".to_string(), None)
    }

    #[test]
    fn test_upload_success_transition() {
        let p = photo("a.jpg");
        let id = p.id;
        let mut album = reduce(&[], &AlbumEvent::Added(vec![p]));

        album = reduce(&album, &AlbumEvent::UploadStarted { id });
        assert_eq!(album[0].status(), PhotoStatus::Uploading);

        album = reduce(&album, &AlbumEvent::Progress { id, percent: 40 });
        album = reduce(&album, &AlbumEvent::UploadSucceeded { id, key: "k/1.jpg".into() });

        let done = &album[0];
        assert!(!done.uploading);
        assert_eq!(done.progress, 100);
        assert!(!done.error);
        assert_eq!(done.key, "k/1.jpg");
        assert_eq!(done.status(), PhotoStatus::Succeeded);
    }

    #[test]
    fn test_upload_failure_transition() {
        let p = photo("a.jpg");
        let id = p.id;
        let mut album = reduce(&[], &AlbumEvent::Added(vec![p]));
        album = reduce(&album, &AlbumEvent::UploadStarted { id });
        album = reduce(&album, &AlbumEvent::Progress { id, percent: 70 });
        album = reduce(&album, &AlbumEvent::UploadFailed { id });

        let failed = &album[0];
        assert!(!failed.uploading);
        assert_eq!(failed.progress, 0);
        assert!(failed.error);
        assert!(failed.key.is_empty());
        assert_eq!(failed.status(), PhotoStatus::Failed);
    }

    #[test]
    fn test_progress_never_decreases() {
        let p = photo("a.jpg");
        let id = p.id;
        let mut album = reduce(&[], &AlbumEvent::Added(vec![p]));
        album = reduce(&album, &AlbumEvent::UploadStarted { id });

        for percent in [10, 55, 30, 180] {
            album = reduce(&album, &AlbumEvent::Progress { id, percent });
        }

        assert_eq!(album[0].progress, 100);
    }

    #[test]
    fn test_progress_ignored_when_not_uploading() {
        let p = photo("a.jpg");
        let id = p.id;
        let album = reduce(&[], &AlbumEvent::Added(vec![p]));
        let album = reduce(&album, &AlbumEvent::Progress { id, percent: 50 });
        assert_eq!(album[0].progress, 0);
    }

    #[test]
    fn test_removed_drops_exactly_one() {
        let photos = vec![photo("a.jpg"), photo("b.jpg"), photo("c.jpg")];
        let target = photos[1].id;
        let album = reduce(&[], &AlbumEvent::Added(photos.clone()));

        let album = reduce(&album, &AlbumEvent::Removed { id: target });

        assert_eq!(album.len(), 2);
        assert_eq!(album[0].id, photos[0].id);
        assert_eq!(album[1].id, photos[2].id);
    }

    #[test]
    fn test_added_respects_capacity() {
        let first: Vec<_> = (0..18).map(|i| photo(&format!("{i}.jpg"))).collect();
        let album = reduce(&[], &AlbumEvent::Added(first));
        let more: Vec<_> = (0..5).map(|i| photo(&format!("x{i}.jpg"))).collect();

        let album = reduce(&album, &AlbumEvent::Added(more));

        assert_eq!(album.len(), MAX_ALBUM_PHOTOS);
    }

    #[test]
    fn test_unknown_id_is_a_no_op() {
        let album = reduce(&[], &AlbumEvent::Added(vec![photo("a.jpg")]));
        let after = reduce(&album, &AlbumEvent::UploadFailed { id: uuid::Uuid::new_v4() });
        assert_eq!(album, after);
    }

    #[test]
    fn test_store_interleaved_updates_are_not_lost() {
        let store = AlbumStore::default();
        let a = photo("a.jpg");
        let b = photo("b.jpg");
        let (ida, idb) = (a.id, b.id);
        store.dispatch(AlbumEvent::Added(vec![a, b]));

        // A stale snapshot taken before either upload starts.
        let stale = store.snapshot();

        store.dispatch(AlbumEvent::UploadStarted { id: ida });
        store.dispatch(AlbumEvent::UploadStarted { id: idb });
        store.dispatch(AlbumEvent::UploadSucceeded { id: ida, key: "a".into() });
        store.dispatch(AlbumEvent::Progress { id: idb, percent: 50 });

        let album = store.snapshot();
        assert_eq!(album[0].status(), PhotoStatus::Succeeded);
        assert_eq!(album[1].progress, 50);
        assert!(stale.iter().all(|p| p.status() == PhotoStatus::Pending));
    }

    #[tokio::test]
    async fn test_store_notifies_subscribers() {
        let store = AlbumStore::default();
        let mut rx = store.subscribe();

        store.dispatch(AlbumEvent::Added(vec![photo("a.jpg")]));

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 1);
    }
}
