//! Thumbnail generation, encoding, and perceptual signatures.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::debug;

use super::types::{EncodedThumbnail, MediaAsset, MediaFormat, PerceptualSignature, Thumbnail};
use super::MediaError;

/// Resize to exactly `width` x `height` with Lanczos resampling.
///
/// The source aspect ratio is not preserved.
pub fn make_thumbnail(asset: &MediaAsset, width: u32, height: u32) -> Thumbnail {
    let image = asset.image.resize_exact(width, height, FilterType::Lanczos3);
    let (width, height) = image.dimensions();
    Thumbnail {
        image,
        width,
        height,
    }
}

/// Encode a thumbnail. Only JPEG and PNG output is supported.
pub fn encode(thumbnail: &Thumbnail, format: MediaFormat) -> Result<Vec<u8>, MediaError> {
    let image = match format {
        // The JPEG encoder rejects alpha channels
        MediaFormat::Jpeg => DynamicImage::ImageRgb8(thumbnail.image.to_rgb8()),
        MediaFormat::Png => thumbnail.image.clone(),
        other => return Err(MediaError::UnsupportedFormat(other.to_string())),
    };

    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, format.image_format())
        .map_err(|e| MediaError::Encode(e.to_string()))?;
    Ok(buffer.into_inner())
}

/// Output format for a thumbnail of the given source format.
///
/// JPEG and PNG sources keep their format; anything else becomes JPEG.
pub fn thumbnail_format(source: MediaFormat) -> MediaFormat {
    match source {
        MediaFormat::Jpeg | MediaFormat::Png => source,
        _ => MediaFormat::Jpeg,
    }
}

/// Blurhash components along each axis.
const BLURHASH_COMPONENTS: (u32, u32) = (4, 3);

/// 4x3 blurhash of the thumbnail.
pub fn signature(thumbnail: &Thumbnail) -> Result<PerceptualSignature, MediaError> {
    let rgba = thumbnail.image.to_rgba8();
    let (x, y) = BLURHASH_COMPONENTS;
    let hash = blurhash::encode(x, y, rgba.width(), rgba.height(), rgba.as_raw())
        .map_err(|e| MediaError::Encode(format!("blurhash: {}", e)))?;
    Ok(PerceptualSignature::new(hash))
}

/// Thumbnail, encode, and sign in one step.
pub fn prepare_thumbnail(
    asset: &MediaAsset,
    width: u32,
    height: u32,
) -> Result<(EncodedThumbnail, PerceptualSignature), MediaError> {
    let thumbnail = make_thumbnail(asset, width, height);
    let format = thumbnail_format(asset.format);
    if format != asset.format {
        debug!(
            source = %asset.format,
            target = %format,
            "Thumbnail encoder does not support source format, using fallback"
        );
    }

    let bytes = encode(&thumbnail, format)?;
    let signature = signature(&thumbnail)?;

    Ok((
        EncodedThumbnail {
            bytes,
            format,
            width: thumbnail.width,
            height: thumbnail.height,
        },
        signature,
    ))
}
