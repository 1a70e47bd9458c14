//! Matrix client-server API backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::types::{ContentUri, EventId, RoomMessage};
use super::{ChatBackend, ChatError};
use crate::metrics::{record_request, EXTERNAL_SERVICE_DURATION};
use crate::retry::RetryPolicy;

/// Matrix connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// Homeserver base URL, e.g. `https://matrix.example.org`.
    pub homeserver: String,
    /// Access token of the posting account.
    pub access_token: String,
    /// Room to post into (`!id:server`).
    pub room_id: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Matrix backend over plain HTTP.
pub struct MatrixClient {
    client: Client,
    config: MatrixConfig,
    upload_retry: RetryPolicy,
}

impl MatrixClient {
    pub fn new(config: MatrixConfig, upload_retry: RetryPolicy) -> Result<Self, ChatError> {
        if config.access_token.is_empty() {
            return Err(ChatError::NotConfigured(
                "Matrix access token is required".to_string(),
            ));
        }
        if config.room_id.is_empty() {
            return Err(ChatError::NotConfigured("Matrix room id is required".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            config,
            upload_retry,
        })
    }

    pub fn room_id(&self) -> &str {
        &self.config.room_id
    }

    fn base(&self) -> &str {
        self.config.homeserver.trim_end_matches('/')
    }

    fn upload_url(&self, filename: &str) -> String {
        format!(
            "{}/_matrix/media/v3/upload?filename={}",
            self.base(),
            urlencoding::encode(filename)
        )
    }

    fn send_url(&self, txn_id: &str) -> String {
        format!(
            "{}/_matrix/client/v3/rooms/{}/send/m.room.message/{}",
            self.base(),
            urlencoding::encode(&self.config.room_id),
            txn_id
        )
    }

    async fn upload_once(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        filename: &str,
    ) -> Result<ContentUri, ChatError> {
        let response = self
            .client
            .post(self.upload_url(filename))
            .bearer_auth(&self.config.access_token)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let body: UploadResponse = parse_response(response).await?;
        Ok(ContentUri::new(body.content_uri))
    }
}

#[async_trait]
impl ChatBackend for MatrixClient {
    fn name(&self) -> &str {
        "matrix"
    }

    async fn upload(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        filename: &str,
    ) -> Result<ContentUri, ChatError> {
        debug!(filename, mime_type, size = bytes.len(), "Uploading to Matrix");
        let started = Instant::now();

        let result = self
            .upload_retry
            .run("matrix_upload", || {
                self.upload_once(bytes.clone(), mime_type, filename)
            })
            .await;

        EXTERNAL_SERVICE_DURATION
            .with_label_values(&["matrix", "upload"])
            .observe(started.elapsed().as_secs_f64());
        record_request("matrix", "upload", result.is_ok());
        result
    }

    async fn send(&self, message: &RoomMessage) -> Result<EventId, ChatError> {
        let txn_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();

        let result = async {
            let response = self
                .client
                .put(self.send_url(&txn_id))
                .bearer_auth(&self.config.access_token)
                .json(message)
                .send()
                .await
                .map_err(|e| ChatError::Transport(e.to_string()))?;
            let body: SendResponse = parse_response(response).await?;
            Ok::<_, ChatError>(EventId::new(body.event_id))
        }
        .await;

        EXTERNAL_SERVICE_DURATION
            .with_label_values(&["matrix", "send"])
            .observe(started.elapsed().as_secs_f64());
        record_request("matrix", "send", result.is_ok());

        if let Ok(event_id) = &result {
            info!(event_id = %event_id, msgtype = ?message.msgtype, "Posted Matrix message");
        }
        result
    }
}

async fn parse_response<T>(response: Response) -> Result<T, ChatError>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<MatrixErrorBody>(&text)
            .map(|e| format!("{}: {}", e.errcode, e.error))
            .unwrap_or(text);
        return Err(ChatError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| ChatError::Parse(e.to_string()))
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct UploadResponse {
    content_uri: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    event_id: String,
}

#[derive(Debug, Deserialize)]
struct MatrixErrorBody {
    #[serde(default)]
    errcode: String,
    #[serde(default)]
    error: String,
}
