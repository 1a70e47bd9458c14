//! Image acquisition and transcoding.
//!
//! The fetcher downloads and decodes catalog images; the transcoder derives
//! fixed-size thumbnails and perceptual signatures from them.

mod config;
mod fetcher;
pub mod transcoder;
mod types;

pub use config::{MediaConfig, ScreenshotOrder};
pub use fetcher::{decode, sniff_format, HttpMediaFetcher};
pub use transcoder::{encode, make_thumbnail, prepare_thumbnail, signature, thumbnail_format};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::retry::{is_transient_status, Retryable};

/// Errors that can occur while fetching or transcoding an image.
#[derive(Debug, Clone, Error)]
pub enum MediaError {
    /// Network failure talking to the image host.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Image host answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    Http { status: u16, url: String },

    /// Response body exceeded the configured cap.
    #[error("Image exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    /// Bytes could not be decoded by any decoder.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Format outside the supported set.
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Encoder failure.
    #[error("Failed to encode image: {0}")]
    Encode(String),
}

impl Retryable for MediaError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }
}

/// Downloads and decodes images.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch `url` and decode it.
    async fn fetch(&self, url: &str) -> Result<MediaAsset, MediaError>;
}

/// Fetch an image and derive its thumbnail and signature.
///
/// Resizing and encoding run on the blocking pool.
pub async fn fetch_and_prepare(
    fetcher: &dyn MediaFetcher,
    url: &str,
    width: u32,
    height: u32,
) -> Result<PreparedImage, MediaError> {
    let original = fetcher.fetch(url).await?;

    let (original, thumbnail, signature) = tokio::task::spawn_blocking(move || {
        prepare_thumbnail(&original, width, height)
            .map(|(thumbnail, signature)| (original, thumbnail, signature))
    })
    .await
    .map_err(|e| MediaError::Encode(format!("thumbnail task failed: {}", e)))??;

    Ok(PreparedImage {
        source_url: url.to_string(),
        original,
        thumbnail,
        signature,
    })
}
