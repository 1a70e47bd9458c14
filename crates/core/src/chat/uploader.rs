//! Uploads prepared images and builds their descriptors.

use std::sync::Arc;

use tracing::debug;

use super::types::{AssetDescriptor, ContentUri, UploadedAsset};
use super::{ChatBackend, ChatError};
use crate::media::PreparedImage;

/// Pushes encoded images to the chat backend's content store.
#[derive(Clone)]
pub struct AssetUploader {
    backend: Arc<dyn ChatBackend>,
}

impl AssetUploader {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Upload raw bytes and describe them.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        filename: &str,
        width: u32,
        height: u32,
    ) -> Result<(ContentUri, AssetDescriptor), ChatError> {
        let size = bytes.len() as u64;
        let uri = self.backend.upload(bytes, mime_type, filename).await?;
        Ok((uri, AssetDescriptor::new(mime_type, size, width, height)))
    }

    /// Upload the original and its thumbnail; the returned descriptor
    /// references the thumbnail and carries the signature.
    pub async fn upload_image(
        &self,
        image: &PreparedImage,
        basename: &str,
    ) -> Result<UploadedAsset, ChatError> {
        let original = &image.original;
        let filename = format!("{}.{}", basename, original.format.extension());
        let (uri, descriptor) = self
            .upload(
                original.bytes.clone(),
                original.format.mime_type(),
                &filename,
                original.width,
                original.height,
            )
            .await?;

        let thumb = &image.thumbnail;
        let thumb_filename = format!("{}_thumb.{}", basename, thumb.format.extension());
        let (thumb_uri, thumb_descriptor) = self
            .upload(
                thumb.bytes.clone(),
                thumb.format.mime_type(),
                &thumb_filename,
                thumb.width,
                thumb.height,
            )
            .await?;

        debug!(
            source = %image.source_url,
            uri = %uri,
            thumbnail = %thumb_uri,
            "Uploaded image"
        );

        let descriptor = descriptor
            .with_thumbnail(thumb_uri, thumb_descriptor)
            .with_signature(image.signature.clone());
        Ok(UploadedAsset {
            uri,
            descriptor,
            filename,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::prepared_image;
    use crate::testing::MockChatBackend;

    #[tokio::test]
    async fn test_upload_image_links_thumbnail() {
        let backend = Arc::new(MockChatBackend::new());
        let uploader = AssetUploader::new(backend.clone());
        let image = prepared_image("https://img.test/cover.png", 64, 48);

        let asset = uploader.upload_image(&image, "Cover of Doom").await.unwrap();
        let descriptor = &asset.descriptor;

        assert_eq!(asset.filename, "Cover of Doom.png");
        assert_eq!(descriptor.mimetype, "image/png");
        assert_eq!((descriptor.w, descriptor.h), (64, 48));
        assert_eq!(descriptor.size, image.original.bytes.len() as u64);
        assert_eq!(descriptor.signature.as_ref(), Some(&image.signature));

        let thumb = descriptor.thumbnail_info.as_deref().unwrap();
        assert_eq!((thumb.w, thumb.h), (image.thumbnail.width, image.thumbnail.height));
        assert!(descriptor.thumbnail_url.is_some());
        assert_ne!(descriptor.thumbnail_url.as_ref(), Some(&asset.uri));

        let uploads = backend.uploads().await;
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].filename, "Cover of Doom.png");
        assert_eq!(uploads[1].filename, "Cover of Doom_thumb.png");
    }

    #[tokio::test]
    async fn test_upload_failure_propagates() {
        let backend = Arc::new(MockChatBackend::new());
        backend
            .fail_next_upload(ChatError::Api {
                status: 413,
                message: "M_TOO_LARGE".into(),
            })
            .await;
        let uploader = AssetUploader::new(backend.clone());
        let image = prepared_image("https://img.test/a.png", 8, 8);

        let result = uploader.upload_image(&image, "a").await;
        assert!(matches!(result, Err(ChatError::Api { status: 413, .. })));
    }
}
