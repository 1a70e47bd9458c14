//! Mock chat backend for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::chat::{ChatBackend, ChatError, ContentUri, EventId, RoomMessage};

/// A recorded upload for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub filename: String,
    pub mime_type: String,
    pub size: usize,
    pub uri: ContentUri,
}

/// Mock implementation of the ChatBackend trait.
///
/// Uploads return `mxc://mock.server/media<n>` and posts return
/// `$event<n>`, counting from 1.
#[derive(Debug)]
pub struct MockChatBackend {
    uploads: Arc<RwLock<Vec<RecordedUpload>>>,
    /// Messages that were accepted, in posting order.
    messages: Arc<RwLock<Vec<RoomMessage>>>,
    /// Event ids handed out, parallel to `messages`.
    event_ids: Arc<RwLock<Vec<EventId>>>,
    next_upload_error: Arc<RwLock<Option<ChatError>>>,
    next_send_error: Arc<RwLock<Option<ChatError>>>,
    /// If set, every send fails with this error.
    send_failure: Arc<RwLock<Option<ChatError>>>,
    /// Number of send attempts, including rejected ones.
    send_attempts: Arc<RwLock<u32>>,
}

impl Default for MockChatBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChatBackend {
    pub fn new() -> Self {
        Self {
            uploads: Arc::new(RwLock::new(Vec::new())),
            messages: Arc::new(RwLock::new(Vec::new())),
            event_ids: Arc::new(RwLock::new(Vec::new())),
            next_upload_error: Arc::new(RwLock::new(None)),
            next_send_error: Arc::new(RwLock::new(None)),
            send_failure: Arc::new(RwLock::new(None)),
            send_attempts: Arc::new(RwLock::new(0)),
        }
    }

    /// Get recorded uploads.
    pub async fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.read().await.clone()
    }

    /// Get accepted messages.
    pub async fn messages(&self) -> Vec<RoomMessage> {
        self.messages.read().await.clone()
    }

    /// Event ids of accepted messages, in posting order.
    pub async fn event_ids(&self) -> Vec<EventId> {
        self.event_ids.read().await.clone()
    }

    pub async fn send_attempts(&self) -> u32 {
        *self.send_attempts.read().await
    }

    /// Configure the next upload to fail with the given error.
    pub async fn fail_next_upload(&self, error: ChatError) {
        *self.next_upload_error.write().await = Some(error);
    }

    /// Configure the next send to fail with the given error.
    pub async fn fail_next_send(&self, error: ChatError) {
        *self.next_send_error.write().await = Some(error);
    }

    /// Make every send fail until cleared.
    pub async fn fail_all_sends(&self, error: ChatError) {
        *self.send_failure.write().await = Some(error);
    }

    pub async fn clear_failures(&self) {
        *self.next_upload_error.write().await = None;
        *self.next_send_error.write().await = None;
        *self.send_failure.write().await = None;
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn upload(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        filename: &str,
    ) -> Result<ContentUri, ChatError> {
        if let Some(error) = self.next_upload_error.write().await.take() {
            return Err(error);
        }

        let mut uploads = self.uploads.write().await;
        let uri = ContentUri::new(format!("mxc://mock.server/media{}", uploads.len() + 1));
        uploads.push(RecordedUpload {
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            size: bytes.len(),
            uri: uri.clone(),
        });
        Ok(uri)
    }

    async fn send(&self, message: &RoomMessage) -> Result<EventId, ChatError> {
        *self.send_attempts.write().await += 1;

        if let Some(error) = self.next_send_error.write().await.take() {
            return Err(error);
        }
        if let Some(error) = self.send_failure.read().await.clone() {
            return Err(error);
        }

        let mut event_ids = self.event_ids.write().await;
        let event_id = EventId::new(format!("$event{}", event_ids.len() + 1));
        event_ids.push(event_id.clone());
        self.messages.write().await.push(message.clone());
        Ok(event_id)
    }
}
