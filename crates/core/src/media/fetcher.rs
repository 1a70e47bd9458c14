//! HTTP image fetcher with a defensive decoder chain.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use image::GenericImageView;
use reqwest::Client;
use tracing::{debug, warn};

use super::types::{MediaAsset, MediaFormat};
use super::{MediaError, MediaFetcher};
use crate::metrics::{record_request, EXTERNAL_SERVICE_DURATION};
use crate::retry::RetryPolicy;

/// Fetches images over HTTP.
pub struct HttpMediaFetcher {
    client: Client,
    max_bytes: u64,
    retry: RetryPolicy,
}

impl HttpMediaFetcher {
    pub fn new(timeout: Duration, max_bytes: u64, retry: RetryPolicy) -> Result<Self, MediaError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gamecaster/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MediaError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            max_bytes,
            retry,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MediaError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(MediaError::TooLarge {
                    limit: self.max_bytes,
                });
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| MediaError::Transport(e.to_string()))?;
            if bytes.len() as u64 + chunk.len() as u64 > self.max_bytes {
                return Err(MediaError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(bytes)
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<MediaAsset, MediaError> {
        debug!(url, "Fetching image");
        let started = Instant::now();

        let result = self.retry.run("media_fetch", || self.download(url)).await;

        EXTERNAL_SERVICE_DURATION
            .with_label_values(&["media", "fetch"])
            .observe(started.elapsed().as_secs_f64());
        record_request("media", "fetch", result.is_ok());

        let bytes = result?;
        decode(bytes)
    }
}

/// Decode image bytes, trying the generic detector first and then the JPEG
/// and PNG decoders explicitly.
pub fn decode(bytes: Vec<u8>) -> Result<MediaAsset, MediaError> {
    let generic_error = match image::guess_format(&bytes) {
        Ok(detected) => match MediaFormat::from_image_format(detected) {
            Some(format) => match image::load_from_memory_with_format(&bytes, detected) {
                Ok(image) => return Ok(asset(image, format, bytes)),
                Err(e) => e.to_string(),
            },
            None => return Err(MediaError::UnsupportedFormat(format!("{:?}", detected))),
        },
        Err(e) => e.to_string(),
    };
    debug!(error = %generic_error, "Generic image decode failed, trying fallbacks");

    for format in [MediaFormat::Jpeg, MediaFormat::Png] {
        match image::load_from_memory_with_format(&bytes, format.image_format()) {
            Ok(image) => {
                debug!(%format, "Decoded with fallback decoder");
                return Ok(asset(image, format, bytes));
            }
            Err(e) => debug!(%format, error = %e, "Fallback decoder failed"),
        }
    }

    warn!(bytes = bytes.len(), "All image decoders failed");
    Err(MediaError::Decode(generic_error))
}

fn asset(image: image::DynamicImage, format: MediaFormat, bytes: Vec<u8>) -> MediaAsset {
    let (width, height) = image.dimensions();
    MediaAsset {
        image,
        format,
        width,
        height,
        bytes,
    }
}

/// Guess the format of raw bytes without decoding them.
pub fn sniff_format(bytes: &[u8]) -> Option<MediaFormat> {
    image::guess_format(bytes)
        .ok()
        .and_then(MediaFormat::from_image_format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::png_bytes;

    #[test]
    fn test_decode_png() {
        let asset = decode(png_bytes(32, 16)).unwrap();
        assert_eq!(asset.format, MediaFormat::Png);
        assert_eq!((asset.width, asset.height), (32, 16));
        assert!(!asset.bytes.is_empty());
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = decode(b"definitely not an image".to_vec());
        assert!(matches!(result, Err(MediaError::Decode(_))));
    }

    #[test]
    fn test_decode_truncated_png_fails() {
        let mut bytes = png_bytes(32, 32);
        bytes.truncate(40);
        assert!(decode(bytes).is_err());
    }

    #[test]
    fn test_sniff_format() {
        assert_eq!(sniff_format(&png_bytes(4, 4)), Some(MediaFormat::Png));
        assert_eq!(sniff_format(b"nope"), None);
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_transport_error() {
        let fetcher = HttpMediaFetcher::new(
            Duration::from_secs(2),
            1024,
            RetryPolicy::none(),
        )
        .unwrap();
        let result = fetcher.fetch("http://127.0.0.1:9/image.png").await;
        assert!(matches!(result, Err(MediaError::Transport(_))));
    }
}
