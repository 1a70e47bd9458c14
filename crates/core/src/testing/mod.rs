//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every external service
//! trait, so the announcer can be exercised end to end without a catalog,
//! a homeserver or an image host.
//!
//! # Example
//!
//! ```rust,ignore
//! use gamecaster_core::testing::{fixtures, MockCatalog, MockChatBackend, MockMediaFetcher};
//!
//! let catalog = MockCatalog::new();
//! catalog.set_results(vec![fixtures::candidate(1, "Hades", fixtures::timestamp(2020, 9, 17))]).await;
//!
//! let chat = MockChatBackend::new();
//! // ... run the announcer, then inspect chat.messages().await
//! ```

mod mock_catalog;
mod mock_chat;
mod mock_ledger;
mod mock_media;

pub use mock_catalog::{MockCatalog, RecordedCatalogSearch, MOCK_IMAGE_BASE};
pub use mock_chat::{MockChatBackend, RecordedUpload};
pub use mock_ledger::MockLedger;
pub use mock_media::MockMediaFetcher;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::io::Cursor;

    use chrono::{TimeZone, Utc};
    use image::{DynamicImage, ImageFormat, RgbImage};

    use crate::catalog::{AssetRef, GameCategory, GameStatus, SearchCandidate};
    use crate::media::{transcoder, MediaAsset, MediaFormat, PreparedImage};

    /// Fixed "now" for date-sensitive tests: 2025-06-01T00:00:00Z.
    pub const NOW: i64 = 1_748_736_000;

    /// Seconds since epoch at midnight UTC.
    pub fn timestamp(year: i32, month: u32, day: u32) -> i64 {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
            .single()
            .map(|date| date.timestamp())
            .unwrap_or_default()
    }

    /// A released main game with no summary or media.
    pub fn candidate(id: u64, name: &str, first_release_date: i64) -> SearchCandidate {
        SearchCandidate {
            id,
            name: name.to_string(),
            first_release_date,
            category: GameCategory::MainGame,
            status: GameStatus::Released,
            summary: String::new(),
            storyline: None,
            url: None,
            rating: None,
            genres: vec![],
            platforms: vec![],
            cover: None,
            screenshots: vec![],
        }
    }

    /// A candidate with a cover and `screenshots` screenshot references,
    /// all carrying inline image ids.
    pub fn candidate_with_media(
        id: u64,
        name: &str,
        first_release_date: i64,
        screenshots: usize,
    ) -> SearchCandidate {
        let mut game = candidate(id, name, first_release_date);
        game.cover = Some(AssetRef::cover(id * 100, format!("co{}", id)));
        game.screenshots = (0..screenshots)
            .map(|i| AssetRef::screenshot(id * 100 + 1 + i as u64, format!("sc{}_{}", id, i)))
            .collect();
        game
    }

    /// A diagonal gradient, so perceptual hashes are not degenerate.
    pub fn gradient(width: u32, height: u32) -> DynamicImage {
        let image = RgbImage::from_fn(width, height, |x, y| {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            image::Rgb([r, g, r.wrapping_add(g)])
        });
        DynamicImage::ImageRgb8(image)
    }

    /// PNG-encoded gradient.
    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        gradient(width, height)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode png fixture");
        bytes
    }

    /// A decoded asset tagged with `format`.
    ///
    /// JPEG assets carry JPEG bytes; every other format carries PNG bytes.
    pub fn media_asset(width: u32, height: u32, format: MediaFormat) -> MediaAsset {
        let image = gradient(width, height);
        let bytes = match format {
            MediaFormat::Jpeg => {
                let mut bytes = Vec::new();
                image
                    .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
                    .expect("encode jpeg fixture");
                bytes
            }
            _ => png_bytes(width, height),
        };
        MediaAsset {
            image,
            format,
            width,
            height,
            bytes,
        }
    }

    /// A PNG asset already thumbnailed to 16x12 and signed.
    pub fn prepared_image(url: &str, width: u32, height: u32) -> PreparedImage {
        let original = media_asset(width, height, MediaFormat::Png);
        let (thumbnail, signature) =
            transcoder::prepare_thumbnail(&original, 16, 12).expect("prepare fixture thumbnail");
        PreparedImage {
            source_url: url.to_string(),
            original,
            thumbnail,
            signature,
        }
    }
}
