use serde::{Deserialize, Serialize};

/// Messaging platform a webhook or outbound call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Telegram,
    Whatsapp,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Telegram => "telegram",
            Self::Whatsapp => "whatsapp",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "telegram" => Ok(Self::Telegram),
            "whatsapp" => Ok(Self::Whatsapp),
            other => Err(crate::Error::unknown_platform(other)),
        }
    }
}

/// Canonical message content kind, shared by every platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Location,
    Contact,
    Sticker,
    /// A provider subtype we do not model. Content/caption is preserved so
    /// nothing is silently dropped.
    Unsupported,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Location => "location",
            Self::Contact => "contact",
            Self::Sticker => "sticker",
            Self::Unsupported => "unsupported",
        }
    }

    /// Parse the stored TEXT column back into a kind. Unknown values map to
    /// `Unsupported` rather than failing a row read.
    pub fn parse(s: &str) -> Self {
        match s {
            "text" => Self::Text,
            "image" => Self::Image,
            "video" => Self::Video,
            "audio" => Self::Audio,
            "document" => Self::Document,
            "location" => Self::Location,
            "contact" => Self::Contact,
            "sticker" => Self::Sticker,
            _ => Self::Unsupported,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile fields observed alongside an inbound message. Merged into the
/// contact record on every delivery; empty fields never overwrite known ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileHint {
    pub display_name: Option<String>,
    pub username: Option<String>,
}

impl ProfileHint {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.username.is_none()
    }
}

/// A provider-agnostic inbound message event, produced by a connector's
/// normalizer. Transient: this is pipeline input, not a persisted row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub platform: Platform,
    /// Platform user id of the sender.
    pub sender_id: String,
    /// Platform chat / phone id the message arrived in.
    pub thread_id: String,
    /// Provider-assigned message id — the idempotency key.
    pub message_id: String,
    pub kind: MessageKind,
    pub content: String,
    pub media_ref: Option<String>,
    /// Provider message id this message replies to, if any.
    pub reply_to: Option<String>,
    /// Provider timestamp, unix seconds.
    pub timestamp: i64,
    /// True for edited-message webhooks: `message_id` is the original id and
    /// `content` carries the replacement text.
    pub edited: bool,
    pub profile: ProfileHint,
    /// Provider-specific leftovers that have no canonical field.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// One normalized item out of a webhook payload. A single delivery may carry
/// several of these; each is processed independently of its siblings.
#[derive(Debug, Clone)]
pub enum NormalizedUpdate {
    Message(InboundEvent),
    /// Delivery receipt / status echo referencing a message id, typically one
    /// this system sent outbound.
    Receipt {
        message_id: String,
        status: String,
    },
    /// Recognized but deliberately not ingested (wrong field, own echo, etc.).
    Ignored { reason: String },
    /// One item of the batch could not be parsed. Siblings still process.
    Malformed { detail: String },
}

/// Whole-payload normalization failure. Non-fatal to the provider: the
/// webhook is acknowledged and the payload logged, never retried.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("malformed webhook payload: {detail}")]
    MalformedPayload { detail: String },
}

impl NormalizeError {
    #[must_use]
    pub fn malformed(detail: impl std::fmt::Display) -> Self {
        Self::MalformedPayload {
            detail: detail.to_string(),
        }
    }
}

impl From<serde_json::Error> for NormalizeError {
    fn from(e: serde_json::Error) -> Self {
        Self::malformed(e)
    }
}
