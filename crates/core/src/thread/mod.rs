//! Threaded game announcements.
//!
//! A game with a cover becomes a thread: the cover is the root and each
//! screenshot replies to the post before it. Screenshots are fetched and
//! thumbnailed concurrently, then uploaded and posted one at a time so the
//! reply chain stays well-formed.

mod composer;
mod state;

pub use composer::{FallbackReason, GamePost, ThreadComposer, ThreadOutcome};
pub use state::ThreadState;
