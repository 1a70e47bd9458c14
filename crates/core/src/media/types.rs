//! Types for fetched and transcoded images.

use std::fmt;

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};

/// Image encodings the pipeline recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl MediaFormat {
    /// Map a format detected by the `image` crate. Anything else is unknown.
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Gif => Some(Self::Gif),
            ImageFormat::WebP => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Gif => ImageFormat::Gif,
            Self::Webp => ImageFormat::WebP,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
        };
        f.write_str(name)
    }
}

/// A decoded image plus the bytes it was decoded from.
///
/// The raw bytes are kept so the original resolution can be uploaded
/// without re-encoding.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub image: DynamicImage,
    pub format: MediaFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// A resized copy of a [`MediaAsset`].
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub image: DynamicImage,
    pub width: u32,
    pub height: u32,
}

/// Opaque perceptual fingerprint of a thumbnail (a blurhash string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerceptualSignature(String);

impl PerceptualSignature {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PerceptualSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encoded thumbnail bytes ready for upload.
#[derive(Debug, Clone)]
pub struct EncodedThumbnail {
    pub bytes: Vec<u8>,
    pub format: MediaFormat,
    pub width: u32,
    pub height: u32,
}

/// Everything the uploader needs for one image: the original bytes, an
/// encoded thumbnail and the signature.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub source_url: String,
    pub original: MediaAsset,
    pub thumbnail: EncodedThumbnail,
    pub signature: PerceptualSignature,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mapping() {
        assert_eq!(
            MediaFormat::from_image_format(ImageFormat::WebP),
            Some(MediaFormat::Webp)
        );
        assert_eq!(MediaFormat::from_image_format(ImageFormat::Bmp), None);
        assert_eq!(MediaFormat::Jpeg.image_format(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_mime_and_extension() {
        assert_eq!(MediaFormat::Png.mime_type(), "image/png");
        assert_eq!(MediaFormat::Jpeg.extension(), "jpg");
        assert_eq!(MediaFormat::Webp.to_string(), "webp");
    }
}
