//! Types for game catalog records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of catalog entry, mirroring IGDB's `category` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameCategory {
    #[default]
    MainGame,
    DlcAddon,
    Expansion,
    Bundle,
    StandaloneExpansion,
    Mod,
    Episode,
    Season,
    Remake,
    Remaster,
    ExpandedGame,
    Port,
    Fork,
    Pack,
    Update,
    /// A code this client does not know about.
    Other,
}

impl GameCategory {
    /// Map an IGDB category code.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::MainGame,
            1 => Self::DlcAddon,
            2 => Self::Expansion,
            3 => Self::Bundle,
            4 => Self::StandaloneExpansion,
            5 => Self::Mod,
            6 => Self::Episode,
            7 => Self::Season,
            8 => Self::Remake,
            9 => Self::Remaster,
            10 => Self::ExpandedGame,
            11 => Self::Port,
            12 => Self::Fork,
            13 => Self::Pack,
            14 => Self::Update,
            _ => Self::Other,
        }
    }
}

/// Lifecycle status of a catalog entry, mirroring IGDB's `status` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Released,
    Alpha,
    Beta,
    EarlyAccess,
    Offline,
    Cancelled,
    Rumored,
    Delisted,
    /// Status missing from the record or not recognized.
    #[default]
    Unknown,
}

impl GameStatus {
    /// Map an IGDB status code.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Released,
            2 => Self::Alpha,
            3 => Self::Beta,
            4 => Self::EarlyAccess,
            5 => Self::Offline,
            6 => Self::Cancelled,
            7 => Self::Rumored,
            8 => Self::Delisted,
            _ => Self::Unknown,
        }
    }
}

/// Which catalog endpoint an asset reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Cover,
    Screenshot,
}

/// Reference to a cover or screenshot record.
///
/// Search responses usually expand the image id inline; when they don't,
/// the catalog resolves it with a detail fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub kind: AssetKind,
    /// Catalog record id of the cover/screenshot.
    pub id: u64,
    /// Image-host identifier used to build the download URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
}

impl AssetRef {
    pub fn cover(id: u64, image_id: impl Into<String>) -> Self {
        Self {
            kind: AssetKind::Cover,
            id,
            image_id: Some(image_id.into()),
        }
    }

    pub fn screenshot(id: u64, image_id: impl Into<String>) -> Self {
        Self {
            kind: AssetKind::Screenshot,
            id,
            image_id: Some(image_id.into()),
        }
    }
}

/// One catalog record returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCandidate {
    /// Unique catalog identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// First release date, seconds since epoch. 0 = unknown.
    #[serde(default)]
    pub first_release_date: i64,
    #[serde(default)]
    pub category: GameCategory,
    #[serde(default)]
    pub status: GameStatus,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storyline: Option<String>,
    /// Catalog page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Aggregated user rating on a 0-100 scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<AssetRef>,
    #[serde(default)]
    pub screenshots: Vec<AssetRef>,
}

impl SearchCandidate {
    /// Release date as a UTC timestamp, `None` when unknown.
    pub fn release_date(&self) -> Option<DateTime<Utc>> {
        if self.first_release_date == 0 {
            return None;
        }
        DateTime::from_timestamp(self.first_release_date, 0)
    }

    /// Release date formatted as `YYYY-MM-DD`, or `Unknown`.
    pub fn release_date_label(&self) -> String {
        match self.release_date() {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => "Unknown".to_string(),
        }
    }
}
