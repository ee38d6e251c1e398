//! Photo Display Resolver
//!
//! Turns a `PhotoRecord` into something displayable. Local previews are used
//! as-is; stored keys get a view URL from the proxy, cached for the lifetime of
//! the resolver. Cache entries are keyed by object key, so a record whose key
//! changes resolves again.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::client::AlbumApi;
use super::photo::{PhotoRecord, PhotoSource, PreviewRef};

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayImage {
    Local(PreviewRef),
    Remote(String),
}

impl DisplayImage {
    pub fn url(&self) -> String {
        match self {
            DisplayImage::Local(preview) => preview.url(),
            DisplayImage::Remote(url) => url.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unable to load image")]
pub struct UnableToLoad;

pub struct PhotoDisplayResolver {
    api: Arc<dyn AlbumApi>,
    cache: RwLock<HashMap<String, String>>,
}

impl PhotoDisplayResolver {
    pub fn new(api: Arc<dyn AlbumApi>) -> Self {
        Self {
            api,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, photo: &PhotoRecord) -> Result<DisplayImage, UnableToLoad> {
        match photo.source() {
            Some(PhotoSource::Local(preview)) => Ok(DisplayImage::Local(preview)),
            Some(PhotoSource::Remote(key)) => self.resolve_remote(&key).await.map(DisplayImage::Remote),
            None => Err(UnableToLoad),
        }
    }

    async fn resolve_remote(&self, key: &str) -> Result<String, UnableToLoad> {
        if let Some(url) = self.cache.read().await.get(key) {
            return Ok(url.clone());
        }

        match self.api.request_view_url(key).await {
            Ok(url) => {
                debug!(key, "Resolved view URL");
                self.cache.write().await.insert(key.to_string(), url.clone());
                Ok(url)
            }
            Err(e) => {
                warn!(key, "Failed to load image: {}", e);
                Err(UnableToLoad)
            }
        }
    }

    pub async fn cached(&self) -> usize {
        self.cache.read().await.len()
    }
}
