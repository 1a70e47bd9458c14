//! Per-game thread bookkeeping.

use crate::chat::EventId;

/// Root and current reply target of one game's thread.
///
/// The root is set exactly once, by the first successful post, and a reply
/// target never exists without it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadState {
    root: Option<EventId>,
    reply_target: Option<EventId>,
}

impl ThreadState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&EventId> {
        self.root.as_ref()
    }

    pub fn reply_target(&self) -> Option<&EventId> {
        self.reply_target.as_ref()
    }

    /// Record a successful post. The first one becomes the root; every one
    /// becomes the next reply target.
    pub fn record_post(&mut self, event_id: EventId) {
        if self.root.is_none() {
            self.root = Some(event_id.clone());
        }
        self.reply_target = Some(event_id);
    }
}
