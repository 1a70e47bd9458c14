use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::IgdbConfig;
use crate::chat::MatrixConfig;
use crate::matcher::ScorerConfig;
use crate::media::MediaConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub feed: FeedConfig,
    pub igdb: IgdbConfig,
    pub matrix: MatrixConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub matcher: ScorerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Feed polling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    /// RSS/Atom feed URL
    pub url: String,
    /// Seconds between polls (default: 900)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Pause between items within one poll, in milliseconds (default: 2000)
    #[serde(default = "default_item_delay")]
    pub item_delay_ms: u64,
    /// Feed request timeout in seconds (default: 30)
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,
}

impl FeedConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_poll_interval() -> u64 {
    900
}

fn default_item_delay() -> u64 {
    2000
}

fn default_feed_timeout() -> u64 {
    30
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("gamecaster.db")
}

/// Prometheus endpoint configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Address to serve `/metrics` on. Disabled when unset.
    #[serde(default)]
    pub listen: Option<SocketAddr>,
}

/// Sanitized config for startup logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub feed: FeedConfig,
    pub igdb: SanitizedIgdbConfig,
    pub matrix: SanitizedMatrixConfig,
    pub database: DatabaseConfig,
    pub media: MediaConfig,
    pub matcher: ScorerConfig,
    pub metrics: MetricsConfig,
}

/// Sanitized IGDB config (credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedIgdbConfig {
    pub base_url: String,
    pub image_base_url: String,
    pub search_limit: u32,
    pub client_id_configured: bool,
    pub client_secret_configured: bool,
}

/// Sanitized Matrix config (access token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMatrixConfig {
    pub homeserver: String,
    pub room_id: String,
    pub access_token_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            feed: config.feed.clone(),
            igdb: SanitizedIgdbConfig {
                base_url: config.igdb.base_url.clone(),
                image_base_url: config.igdb.image_base_url.clone(),
                search_limit: config.igdb.search_limit,
                client_id_configured: !config.igdb.client_id.is_empty(),
                client_secret_configured: !config.igdb.client_secret.is_empty(),
            },
            matrix: SanitizedMatrixConfig {
                homeserver: config.matrix.homeserver.clone(),
                room_id: config.matrix.room_id.clone(),
                access_token_configured: !config.matrix.access_token.is_empty(),
            },
            database: config.database.clone(),
            media: config.media.clone(),
            matcher: config.matcher.clone(),
            metrics: config.metrics.clone(),
        }
    }
}
