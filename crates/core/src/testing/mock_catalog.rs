//! Mock game catalog for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::{original_image_url, AssetRef, CatalogError, GameCatalog, SearchCandidate};

/// Image host used for URLs built by the mock.
pub const MOCK_IMAGE_BASE: &str = "https://images.mock/upload";

/// A recorded search for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCatalogSearch {
    pub query: String,
    pub limit: u32,
}

/// Mock implementation of the GameCatalog trait.
///
/// Provides controllable behavior for testing:
/// - Return the same results for every query, or per-query results
/// - Track searches for assertions
/// - Simulate failures
#[derive(Debug)]
pub struct MockCatalog {
    /// Results returned when no per-query entry matches.
    results: Arc<RwLock<Vec<SearchCandidate>>>,
    /// Results keyed by exact query string.
    query_results: Arc<RwLock<HashMap<String, Vec<SearchCandidate>>>>,
    /// Image ids for references that arrive without one, keyed by record id.
    image_ids: Arc<RwLock<HashMap<u64, String>>>,
    /// Recorded searches.
    searches: Arc<RwLock<Vec<RecordedCatalogSearch>>>,
    /// If set, the next search will fail with this error.
    next_error: Arc<RwLock<Option<CatalogError>>>,
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalog {
    /// Create a mock catalog that finds nothing.
    pub fn new() -> Self {
        Self {
            results: Arc::new(RwLock::new(Vec::new())),
            query_results: Arc::new(RwLock::new(HashMap::new())),
            image_ids: Arc::new(RwLock::new(HashMap::new())),
            searches: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the results returned for every query.
    pub async fn set_results(&self, results: Vec<SearchCandidate>) {
        *self.results.write().await = results;
    }

    /// Set the results for one exact query.
    pub async fn set_query_results(&self, query: &str, results: Vec<SearchCandidate>) {
        self.query_results
            .write()
            .await
            .insert(query.to_string(), results);
    }

    /// Register the image id returned for a reference lacking one.
    pub async fn set_image_id(&self, asset_id: u64, image_id: &str) {
        self.image_ids
            .write()
            .await
            .insert(asset_id, image_id.to_string());
    }

    /// Get recorded searches.
    pub async fn recorded_searches(&self) -> Vec<RecordedCatalogSearch> {
        self.searches.read().await.clone()
    }

    /// Configure the next search to fail with the given error.
    pub async fn set_next_error(&self, error: CatalogError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl GameCatalog for MockCatalog {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SearchCandidate>, CatalogError> {
        self.searches.write().await.push(RecordedCatalogSearch {
            query: query.to_string(),
            limit,
        });

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let results = match self.query_results.read().await.get(query) {
            Some(results) => results.clone(),
            None => self.results.read().await.clone(),
        };
        Ok(results.into_iter().take(limit as usize).collect())
    }

    async fn resolve_image_id(&self, asset: &AssetRef) -> Result<String, CatalogError> {
        self.image_ids
            .read()
            .await
            .get(&asset.id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("image for asset {}", asset.id)))
    }

    fn image_url(&self, image_id: &str) -> String {
        original_image_url(MOCK_IMAGE_BASE, image_id)
    }
}
