use {async_trait::async_trait, serde::Serialize};

use crate::{
    Result,
    event::{MessageKind, NormalizeError, NormalizedUpdate, Platform},
};

/// Canonical outbound message handed to a connector for delivery.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundPayload {
    pub kind: MessageKind,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
    /// Provider message id to reply to, if the platform supports threading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl OutboundPayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Text,
            content: content.into(),
            media_ref: None,
            reply_to: None,
        }
    }
}

/// Result of a successful provider send.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// Provider-assigned message id, pre-registered in the message store so
    /// later echo webhooks dedupe against it.
    pub provider_message_id: String,
}

/// Core connector trait. Each messaging platform implements this.
pub trait ChannelConnector: Send + Sync {
    /// Platform this connector serves.
    fn platform(&self) -> Platform;

    /// Parse a raw webhook body into canonical updates.
    ///
    /// A top-level parse failure is a [`NormalizeError`]; per-item failures
    /// surface as [`NormalizedUpdate::Malformed`] entries so sibling updates
    /// in the same delivery still process.
    fn normalize(
        &self,
        raw: &serde_json::Value,
    ) -> std::result::Result<Vec<NormalizedUpdate>, NormalizeError>;

    /// Outbound adapter, if this account can send.
    fn outbound(&self) -> Option<&dyn ChannelOutbound>;
}

/// Send messages through a provider API.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    /// Deliver `payload` to `thread_id` and return the provider message id.
    async fn send(&self, thread_id: &str, payload: &OutboundPayload) -> Result<SendReceipt>;
}
