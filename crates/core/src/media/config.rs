//! Media pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Order in which collected screenshots are posted into the thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotOrder {
    /// Original catalog order, matching the caption numbers.
    #[default]
    Index,
    /// Order in which downloads finished.
    Arrival,
}

/// Media pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Thumbnail width in pixels.
    #[serde(default = "default_thumbnail_width")]
    pub thumbnail_width: u32,

    /// Thumbnail height in pixels.
    #[serde(default = "default_thumbnail_height")]
    pub thumbnail_height: u32,

    /// Screenshots posted per game; extras are dropped.
    #[serde(default = "default_max_screenshots")]
    pub max_screenshots: usize,

    /// Shared deadline for the whole screenshot batch, in seconds.
    #[serde(default = "default_batch_timeout")]
    pub screenshot_batch_timeout_secs: u64,

    /// Per-request timeout for image downloads, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Largest accepted image body in bytes.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,

    #[serde(default)]
    pub screenshot_order: ScreenshotOrder,

    /// Retry policy for downloads and uploads.
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_thumbnail_width() -> u32 {
    225
}

fn default_thumbnail_height() -> u32 {
    300
}

fn default_max_screenshots() -> usize {
    5
}

fn default_batch_timeout() -> u64 {
    60
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_max_image_bytes() -> u64 {
    20 * 1024 * 1024 // 20 MiB
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            thumbnail_width: default_thumbnail_width(),
            thumbnail_height: default_thumbnail_height(),
            max_screenshots: default_max_screenshots(),
            screenshot_batch_timeout_secs: default_batch_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
            max_image_bytes: default_max_image_bytes(),
            screenshot_order: ScreenshotOrder::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl MediaConfig {
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.screenshot_batch_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
