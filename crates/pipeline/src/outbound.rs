use std::sync::Arc;

use tracing::{debug, warn};

use {
    convoy_channels::{
        ConnectorRegistry, Error as ChannelError, MessageEvent, MessageEventSink, MessageKind,
        OutboundPayload,
    },
    convoy_common::time::now_ts,
    convoy_storage::{
        Conversation, ConversationStore, Direction, Message, MessageStore, NewMessage,
    },
};

use crate::{error::OutboundError, ingest::preview};

/// Canonical outbound send request, platform-agnostic.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub kind: MessageKind,
    pub content: String,
    pub media_ref: Option<String>,
    /// Provider message id to reply to.
    pub reply_to: Option<String>,
}

impl OutboundRequest {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Text,
            content: content.into(),
            media_ref: None,
            reply_to: None,
        }
    }
}

/// The symmetric outbound path: provider call, then immediate
/// pre-registration of the provider message id so delivery-receipt webhooks
/// referencing it dedupe as already-processed instead of landing as new
/// inbound messages.
pub struct OutboundSender {
    registry: Arc<ConnectorRegistry>,
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    sink: Arc<dyn MessageEventSink>,
}

impl OutboundSender {
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        conversations: Arc<dyn ConversationStore>,
        messages: Arc<dyn MessageStore>,
        sink: Arc<dyn MessageEventSink>,
    ) -> Self {
        Self {
            registry,
            conversations,
            messages,
            sink,
        }
    }

    /// Send `request` into `conversation`'s thread.
    ///
    /// Provider API failures are returned verbatim (native code and
    /// description preserved); no retry is attempted here. No lock is held
    /// across the provider call — the only write happens after it returns.
    pub async fn send(
        &self,
        conversation: &Conversation,
        request: OutboundRequest,
    ) -> Result<Message, OutboundError> {
        let platform = conversation.platform;
        let connector = self
            .registry
            .get(platform)
            .ok_or_else(|| ChannelError::unknown_platform(platform))?;
        let outbound = connector
            .outbound()
            .ok_or_else(|| ChannelError::send_unavailable(format!("{platform} is receive-only")))?;

        let payload = OutboundPayload {
            kind: request.kind,
            content: request.content.clone(),
            media_ref: request.media_ref.clone(),
            reply_to: request.reply_to.clone(),
        };
        let receipt = outbound.send(&conversation.thread_id, &payload).await?;
        debug!(
            conversation_id = conversation.id,
            %platform,
            provider_message_id = receipt.provider_message_id,
            "provider accepted outbound message"
        );

        // Pre-register before the provider's echo webhook can race us.
        let sent_at = now_ts();
        let outcome = self
            .messages
            .insert_unique(&NewMessage {
                conversation_id: conversation.id.clone(),
                contact_id: conversation.contact_id.clone(),
                platform,
                platform_message_id: receipt.provider_message_id.clone(),
                direction: Direction::Outbound,
                kind: request.kind,
                content: request.content.clone(),
                media_ref: request.media_ref,
                reply_to: request.reply_to,
                metadata: serde_json::json!({}),
                created_at: sent_at,
            })
            .await?;

        let content_preview = preview(&request.content);
        if let Err(e) = self
            .conversations
            .touch(&conversation.id, sent_at, &content_preview)
            .await
        {
            warn!(conversation_id = conversation.id, error = %e, "outbound touch failed");
        }

        let message = outcome.message;
        let sink = Arc::clone(&self.sink);
        let tenant_id = conversation.tenant_id.clone();
        let event = MessageEvent::MessageStored {
            conversation_id: message.conversation_id.clone(),
            contact_id: message.contact_id.clone(),
            message_id: message.id.clone(),
            platform,
            direction: Direction::Outbound.as_str().to_string(),
            message_kind: message.kind,
            preview: content_preview,
            created_at: message.created_at,
            tags: Vec::new(),
        };
        tokio::spawn(async move {
            sink.emit(&tenant_id, event).await;
        });

        Ok(message)
    }
}
