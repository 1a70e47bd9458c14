//! Mock media fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::fixtures::media_asset;
use crate::media::{MediaAsset, MediaError, MediaFetcher, MediaFormat};

/// Mock implementation of the MediaFetcher trait.
///
/// Every URL yields a small PNG unless an image, a failure or a delay has
/// been registered for it.
#[derive(Debug)]
pub struct MockMediaFetcher {
    images: Arc<RwLock<HashMap<String, MediaAsset>>>,
    failures: Arc<RwLock<HashMap<String, MediaError>>>,
    delays: Arc<RwLock<HashMap<String, Duration>>>,
    /// If set, every fetch fails with this error.
    fail_all: Arc<RwLock<Option<MediaError>>>,
    /// URLs requested, in call order.
    requests: Arc<RwLock<Vec<String>>>,
}

impl Default for MockMediaFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMediaFetcher {
    pub fn new() -> Self {
        Self {
            images: Arc::new(RwLock::new(HashMap::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            delays: Arc::new(RwLock::new(HashMap::new())),
            fail_all: Arc::new(RwLock::new(None)),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Serve a specific image for `url`.
    pub async fn set_image(&self, url: &str, asset: MediaAsset) {
        self.images.write().await.insert(url.to_string(), asset);
    }

    /// Make every fetch of `url` fail.
    pub async fn fail_url(&self, url: &str, error: MediaError) {
        self.failures.write().await.insert(url.to_string(), error);
    }

    /// Make every fetch fail, whatever the URL.
    pub async fn fail_all(&self, error: MediaError) {
        *self.fail_all.write().await = Some(error);
    }

    /// Delay the response for `url`.
    pub async fn delay_url(&self, url: &str, delay: Duration) {
        self.delays.write().await.insert(url.to_string(), delay);
    }

    /// URLs requested so far.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl MediaFetcher for MockMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<MediaAsset, MediaError> {
        self.requests.write().await.push(url.to_string());

        let delay = self.delays.read().await.get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.fail_all.read().await.clone() {
            return Err(error);
        }
        if let Some(error) = self.failures.read().await.get(url).cloned() {
            return Err(error);
        }

        match self.images.read().await.get(url) {
            Some(asset) => Ok(asset.clone()),
            None => Ok(media_asset(64, 48, MediaFormat::Png)),
        }
    }
}
