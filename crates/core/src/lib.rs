pub mod announcer;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod feed;
pub mod ledger;
pub mod matcher;
pub mod media;
pub mod metrics;
pub mod notify;
pub mod retry;
pub mod testing;
pub mod thread;

pub use announcer::{AnnounceError, Announcer, AnnouncerConfig, ItemOutcome, RunSummary};
pub use catalog::{CatalogError, GameCatalog, IgdbClient, IgdbConfig, SearchCandidate};
pub use chat::{ChatBackend, ChatError, EventId, MatrixClient, MatrixConfig, Relation};
pub use config::{
    config_path, load_config, load_config_from_str, validate_config, Config, ConfigError,
    SanitizedConfig,
};
pub use feed::{FeedError, FeedItem, FeedSource, HttpFeedSource};
pub use ledger::{DedupLedger, LedgerError, SqliteLedger};
pub use matcher::{CandidateResolver, CandidateScorer, MatchError, ScorerConfig};
pub use media::{HttpMediaFetcher, MediaConfig, MediaError, MediaFetcher};
pub use retry::RetryPolicy;
pub use thread::{GamePost, ThreadComposer, ThreadOutcome};
