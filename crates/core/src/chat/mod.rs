//! Chat backend integration.
//!
//! Uploads image content and posts room messages. Threaded replies are
//! expressed through [`Relation`], which cannot represent a reply that names
//! a thread root without an immediate parent.

mod matrix;
mod types;
mod uploader;

pub use matrix::{MatrixClient, MatrixConfig};
pub use types::{
    AssetDescriptor, ContentUri, EventId, MessageType, Relation, RoomMessage, UploadedAsset,
    SIGNATURE_KEY,
};
pub use uploader::AssetUploader;

use async_trait::async_trait;
use thiserror::Error;

use crate::retry::{is_transient_status, Retryable};

/// Errors that can occur when talking to the chat backend.
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    /// Network failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Backend rejected the request.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// A reply named a thread root without a parent event.
    #[error("Invalid relation: {0}")]
    InvalidRelation(String),

    /// Failed to parse a backend response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Client not configured (missing credentials, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl Retryable for ChatError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }
}

/// A chat room that accepts uploads and messages.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Name of this backend for logging.
    fn name(&self) -> &str;

    /// Store content and return its locator.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        filename: &str,
    ) -> Result<ContentUri, ChatError>;

    /// Post a message to the configured room.
    async fn send(&self, message: &RoomMessage) -> Result<EventId, ChatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ChatError::Transport("reset".into()).is_retryable());
        assert!(ChatError::Api {
            status: 429,
            message: "M_LIMIT_EXCEEDED".into()
        }
        .is_retryable());
        assert!(!ChatError::Api {
            status: 403,
            message: "M_FORBIDDEN".into()
        }
        .is_retryable());
        assert!(!ChatError::InvalidRelation("x".into()).is_retryable());
    }
}
