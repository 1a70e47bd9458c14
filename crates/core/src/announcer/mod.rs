//! Feed-driven announcer.
//!
//! Processes feed items one at a time:
//! - **Dedup**: items already in the ledger are skipped
//! - **Match**: the extracted game name is searched and re-ranked
//! - **Publish**: a cover thread, a text fallback, or a plain notice
//!
//! An item is marked processed once something has been posted for it.

mod runner;
mod types;

pub use runner::Announcer;
pub use types::{AnnounceError, AnnouncerConfig, ItemOutcome, RunSummary};
