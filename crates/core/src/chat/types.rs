//! Room message types for the chat backend.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ChatError;
use crate::media::PerceptualSignature;

/// `info` key the perceptual signature is published under. Clients render
/// it as a placeholder while the image loads.
pub const SIGNATURE_KEY: &str = "xyz.amorgan.blurhash";

/// Locator of uploaded content (`mxc://server/media-id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentUri(String);

impl ContentUri {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a posted room event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata describing an uploaded image (the `info` block of `m.image`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub mimetype: String,
    pub size: u64,
    pub w: u32,
    pub h: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<ContentUri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_info: Option<Box<AssetDescriptor>>,
    #[serde(
        rename = "xyz.amorgan.blurhash",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub signature: Option<PerceptualSignature>,
}

impl AssetDescriptor {
    pub fn new(mimetype: impl Into<String>, size: u64, w: u32, h: u32) -> Self {
        Self {
            mimetype: mimetype.into(),
            size,
            w,
            h,
            thumbnail_url: None,
            thumbnail_info: None,
            signature: None,
        }
    }

    /// Attach the uploaded thumbnail.
    pub fn with_thumbnail(mut self, url: ContentUri, info: AssetDescriptor) -> Self {
        self.thumbnail_url = Some(url);
        self.thumbnail_info = Some(Box::new(info));
        self
    }

    pub fn with_signature(mut self, signature: PerceptualSignature) -> Self {
        self.signature = Some(signature);
        self
    }
}

/// An uploaded image ready to be posted.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedAsset {
    pub uri: ContentUri,
    pub descriptor: AssetDescriptor,
    pub filename: String,
}

/// How a message relates to earlier events.
///
/// A threaded reply always names both the thread root and its immediate
/// parent, so an ill-formed relation cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Relation {
    #[default]
    None,
    Thread { root: EventId, parent: EventId },
    Reply { parent: EventId },
}

impl Relation {
    /// Build a relation from optional root and parent ids.
    ///
    /// A root without a parent is rejected.
    pub fn from_parts(root: Option<EventId>, parent: Option<EventId>) -> Result<Self, ChatError> {
        match (root, parent) {
            (None, None) => Ok(Self::None),
            (Some(root), Some(parent)) => Ok(Self::Thread { root, parent }),
            (None, Some(parent)) => Ok(Self::Reply { parent }),
            (Some(root), None) => Err(ChatError::InvalidRelation(format!(
                "thread root {} given without a parent event",
                root
            ))),
        }
    }

    fn relates_to(&self) -> Option<RelatesTo> {
        match self {
            Self::None => None,
            Self::Thread { root, parent } => Some(RelatesTo {
                event_id: Some(root.clone()),
                rel_type: Some(THREAD_REL_TYPE),
                is_falling_back: Some(true),
                in_reply_to: InReplyTo {
                    event_id: parent.clone(),
                },
            }),
            Self::Reply { parent } => Some(RelatesTo {
                event_id: None,
                rel_type: None,
                is_falling_back: None,
                in_reply_to: InReplyTo {
                    event_id: parent.clone(),
                },
            }),
        }
    }
}

const THREAD_REL_TYPE: &str = "m.thread";
const HTML_FORMAT: &str = "org.matrix.custom.html";

#[derive(Debug, Clone, PartialEq, Serialize)]
struct RelatesTo {
    #[serde(skip_serializing_if = "Option::is_none")]
    event_id: Option<EventId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rel_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_falling_back: Option<bool>,
    #[serde(rename = "m.in_reply_to")]
    in_reply_to: InReplyTo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct InReplyTo {
    event_id: EventId,
}

/// Message types this crate posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageType {
    #[serde(rename = "m.text")]
    Text,
    #[serde(rename = "m.image")]
    Image,
}

/// Content of an `m.room.message` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomMessage {
    pub msgtype: MessageType,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<ContentUri>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<AssetDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(rename = "m.relates_to", skip_serializing_if = "Option::is_none")]
    relates_to: Option<RelatesTo>,
    #[serde(skip)]
    relation: Relation,
}

impl RoomMessage {
    /// Plain or HTML-formatted text message.
    pub fn text(body: impl Into<String>, html: Option<String>) -> Self {
        Self {
            msgtype: MessageType::Text,
            body: body.into(),
            format: html.as_ref().map(|_| HTML_FORMAT),
            formatted_body: html,
            url: None,
            info: None,
            filename: None,
            relates_to: None,
            relation: Relation::None,
        }
    }

    /// Image message for an uploaded asset.
    pub fn for_asset(
        caption: impl Into<String>,
        html: Option<String>,
        asset: &UploadedAsset,
    ) -> Self {
        Self::image(
            caption,
            html,
            asset.filename.clone(),
            asset.uri.clone(),
            asset.descriptor.clone(),
        )
    }

    /// Image message pointing at uploaded content.
    pub fn image(
        caption: impl Into<String>,
        html: Option<String>,
        filename: impl Into<String>,
        url: ContentUri,
        info: AssetDescriptor,
    ) -> Self {
        Self {
            msgtype: MessageType::Image,
            body: caption.into(),
            format: html.as_ref().map(|_| HTML_FORMAT),
            formatted_body: html,
            url: Some(url),
            info: Some(info),
            filename: Some(filename.into()),
            relates_to: None,
            relation: Relation::None,
        }
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relates_to = relation.relates_to();
        self.relation = relation;
        self
    }

    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    /// Whether the message carries an HTML body.
    pub fn is_formatted(&self) -> bool {
        self.formatted_body.is_some()
    }
}
