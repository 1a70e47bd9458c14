//! Release feed polling and title extraction.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::metrics::{record_request, EXTERNAL_SERVICE_DURATION};

/// Errors that can occur when reading the feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Feed host returned a non-success status.
    #[error("Feed returned HTTP {0}")]
    Status(u16),

    /// Body was not a valid RSS/Atom document.
    #[error("Failed to parse feed: {0}")]
    ParseError(String),
}

/// One entry from the release feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Stable identity used for deduplication.
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
}

impl FeedItem {
    /// Build an item, deriving the id from the link or title when the
    /// entry has none.
    pub fn new(id: Option<String>, title: impl Into<String>, link: Option<String>) -> Self {
        let title = title.into();
        let id = id
            .filter(|id| !id.trim().is_empty())
            .or_else(|| link.clone().filter(|l| !l.is_empty()))
            .unwrap_or_else(|| title_digest(&title));
        Self {
            id,
            title,
            link,
            published: None,
        }
    }

    /// Link for messages, empty when the entry has none.
    pub fn link_or_empty(&self) -> &str {
        self.link.as_deref().unwrap_or("")
    }
}

fn title_digest(title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hex::encode(hasher.finalize())
}

/// A source of release announcements.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the current entries, in feed order.
    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError>;
}

/// RSS/Atom feed over HTTP.
pub struct HttpFeedSource {
    client: Client,
    url: String,
}

impl HttpFeedSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError> {
        let started = Instant::now();
        let result = async {
            let response = self.client.get(&self.url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FeedError::Status(status.as_u16()));
            }
            let bytes = response.bytes().await?;
            parse_feed(&bytes)
        }
        .await;

        EXTERNAL_SERVICE_DURATION
            .with_label_values(&["feed", "fetch"])
            .observe(started.elapsed().as_secs_f64());
        record_request("feed", "fetch", result.is_ok());

        if let Ok(items) = &result {
            info!(url = %self.url, items = items.len(), "Fetched feed");
        }
        result
    }
}

/// Parse an RSS or Atom document.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedItem>, FeedError> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| FeedError::ParseError(e.to_string()))?;

    let items = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let title = entry.title.map(|t| t.content)?;
            let link = entry.links.first().map(|l| l.href.clone());
            let mut item = FeedItem::new(Some(entry.id), title, link);
            item.published = entry.published.or(entry.updated);
            Some(item)
        })
        .collect();

    Ok(items)
}

/// Release-title patterns, tried in order. The first capture is the name.
static TITLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^(.+?)\s*\[.*?\]",    // Name [Release Info]
        r"^(.+?)\s*\(.*?\)",    // Name (Release Info)
        r"^(.+?)\s*-\s*.*",     // Name - Release Info
        r"^(.+?)\s*v?\d+\.\d+", // Name v1.0
        r"^(.+?)\s*PC.*",
        r"^(.+?)\s*REPACK.*",
        r"^(.+?)\s*CRACK.*",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Pull the game name out of a release title.
///
/// Falls back to the trimmed title when no pattern matches.
pub fn extract_game_name(title: &str) -> String {
    for pattern in TITLE_PATTERNS.iter() {
        if let Some(name) = pattern.captures(title).and_then(|c| c.get(1)) {
            let name = name
                .as_str()
                .trim()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .trim();
            if !name.is_empty() {
                debug!(title, name, "Extracted game name");
                return name.to_string();
            }
        }
    }
    title.trim().to_string()
}
