use async_trait::async_trait;

use crate::event::{MessageKind, Platform};

/// Events emitted after a message-store commit, fanned out to live
/// dashboard subscribers. Fields stay flat so the frames serialize without
/// pulling storage types into this crate.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageEvent {
    MessageStored {
        conversation_id: String,
        contact_id: String,
        message_id: String,
        platform: Platform,
        direction: String,
        message_kind: MessageKind,
        preview: String,
        created_at: i64,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tags: Vec<String>,
    },
    MessageEdited {
        conversation_id: String,
        message_id: String,
        platform: Platform,
        preview: String,
        edited_at: i64,
    },
    ConversationEscalated {
        conversation_id: String,
        contact_id: String,
        priority: String,
    },
}

/// Sink for post-commit message events — the gateway provides the concrete
/// implementation (WebSocket fan-out). Best-effort, at-most-once: an
/// implementation must swallow and log its own failures; the ingestion
/// pipeline never observes them.
#[async_trait]
pub trait MessageEventSink: Send + Sync {
    async fn emit(&self, tenant_id: &str, event: MessageEvent);
}

/// Sink that drops every event. Used when no live subscribers exist
/// (tests, one-shot CLI runs).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

#[async_trait]
impl MessageEventSink for NullEventSink {
    async fn emit(&self, _tenant_id: &str, _event: MessageEvent) {}
}
