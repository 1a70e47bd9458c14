//! Types for the announcer.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::{ChatError, EventId};
use crate::config::Config;
use crate::feed::FeedError;
use crate::ledger::LedgerError;
use crate::thread::FallbackReason;

/// Errors that can occur while announcing.
#[derive(Debug, Error)]
pub enum AnnounceError {
    /// Feed could not be fetched.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// Dedup ledger failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Nothing could be posted for the item.
    #[error("chat error: {0}")]
    Chat(#[from] ChatError),
}

/// What happened to one feed item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    /// Already announced earlier.
    Skipped,
    /// Announced as a cover thread.
    Threaded {
        event_id: EventId,
        game: String,
        score: f32,
        replies: usize,
    },
    /// Matched a game but announced it as text.
    TextFallback {
        event_id: EventId,
        game: String,
        reason: FallbackReason,
    },
    /// No catalog match; the unenriched notice was posted.
    PlainNotice { event_id: EventId },
}

impl ItemOutcome {
    /// Label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Threaded { .. } => "threaded",
            Self::TextFallback { .. } => "text_fallback",
            Self::PlainNotice { .. } => "plain_notice",
        }
    }

    /// First event posted for the item, if any.
    pub fn event_id(&self) -> Option<&EventId> {
        match self {
            Self::Skipped => None,
            Self::Threaded { event_id, .. }
            | Self::TextFallback { event_id, .. }
            | Self::PlainNotice { event_id } => Some(event_id),
        }
    }
}

/// Counts from one pass over the feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub fetched: usize,
    pub skipped: usize,
    pub announced: usize,
    pub failed: usize,
}

/// Announcer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncerConfig {
    /// Pause after each announced item.
    pub item_delay: Duration,
    /// Candidates requested per catalog search.
    pub search_limit: u32,
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self {
            item_delay: Duration::from_millis(2000),
            search_limit: 10,
        }
    }
}

impl From<&Config> for AnnouncerConfig {
    fn from(config: &Config) -> Self {
        Self {
            item_delay: config.feed.item_delay(),
            search_limit: config.igdb.search_limit,
        }
    }
}
