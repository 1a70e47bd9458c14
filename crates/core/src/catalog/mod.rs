//! Game catalog integration.
//!
//! The catalog answers free-text searches with a list of candidate records
//! and turns cover/screenshot references into downloadable image URLs.
//! Ranking the results is not the catalog's job; see [`crate::matcher`].

mod igdb;
mod types;

pub use igdb::{IgdbClient, IgdbConfig};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Could not obtain an access token.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing credentials, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

/// A searchable game catalog.
#[async_trait]
pub trait GameCatalog: Send + Sync {
    /// Name of this catalog for logging.
    fn name(&self) -> &str;

    /// Search for games by free-text query.
    ///
    /// Results come back in the catalog's own relevance order; callers are
    /// expected to re-rank them.
    async fn search(&self, query: &str, limit: u32)
        -> Result<Vec<SearchCandidate>, CatalogError>;

    /// Look up the image-host identifier for a reference that lacks one.
    async fn resolve_image_id(&self, asset: &AssetRef) -> Result<String, CatalogError>;

    /// Build the canonical full-resolution URL for an image id.
    fn image_url(&self, image_id: &str) -> String;

    /// Resolve a reference to a downloadable URL, fetching the image id
    /// when the search response did not include it.
    async fn asset_url(&self, asset: &AssetRef) -> Result<String, CatalogError> {
        let image_id = match &asset.image_id {
            Some(id) => id.clone(),
            None => self.resolve_image_id(asset).await?,
        };
        Ok(self.image_url(&image_id))
    }
}

/// Build `<base>/t_original/<image_id>.webp`.
pub fn original_image_url(image_base_url: &str, image_id: &str) -> String {
    format!(
        "{}/t_original/{}.webp",
        image_base_url.trim_end_matches('/'),
        image_id
    )
}
