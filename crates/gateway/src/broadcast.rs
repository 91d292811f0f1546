//! WebSocket fan-out of pipeline events.
//!
//! Best-effort, at-most-once: a full or closed client channel drops the
//! frame for that client, serialization failures are logged and swallowed.
//! Nothing here can fail the ingestion pipeline.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use {
    async_trait::async_trait,
    serde::Serialize,
    std::sync::Arc,
    tokio::sync::{RwLock, mpsc},
    tracing::{debug, warn},
};

use {
    convoy_channels::{MessageEvent, MessageEventSink},
    convoy_common::time::now_ms,
};

/// Server-push frame sent to dashboard subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct EventFrame {
    pub r#type: &'static str,
    pub event: &'static str,
    pub payload: serde_json::Value,
    pub seq: u64,
    pub ts: i64,
}

/// A WebSocket client currently subscribed to a tenant's event stream.
#[derive(Debug)]
pub struct ConnectedClient {
    pub conn_id: String,
    pub tenant_id: String,
    /// Channel feeding this client's write loop.
    pub sender: mpsc::UnboundedSender<String>,
}

impl ConnectedClient {
    /// Returns false when the write loop is gone; the caller drops the frame.
    pub fn send(&self, frame: &str) -> bool {
        self.sender.send(frame.to_string()).is_ok()
    }
}

/// Registry of connected WebSocket clients, shared between the server and
/// the event sink.
#[derive(Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<String, ConnectedClient>>,
    seq: AtomicU64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub async fn register(&self, client: ConnectedClient) {
        self.clients
            .write()
            .await
            .insert(client.conn_id.clone(), client);
    }

    pub async fn remove(&self, conn_id: &str) {
        self.clients.write().await.remove(conn_id);
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Push an event frame to every client subscribed to `tenant_id`.
    pub async fn broadcast(&self, tenant_id: &str, event: &'static str, payload: serde_json::Value) {
        let frame = EventFrame {
            r#type: "event",
            event,
            payload,
            seq: self.next_seq(),
            ts: now_ms(),
        };
        let json = match serde_json::to_string(&frame) {
            Ok(j) => j,
            Err(e) => {
                warn!(event, error = %e, "failed to serialize event frame");
                return;
            },
        };

        let clients = self.clients.read().await;
        debug!(event, tenant_id, clients = clients.len(), "broadcasting event");
        for client in clients.values() {
            if client.tenant_id != tenant_id {
                continue;
            }
            if !client.send(&json) {
                debug!(conn_id = %client.conn_id, "client channel closed, frame dropped");
            }
        }
    }
}

/// The live [`MessageEventSink`]: pipeline events → WebSocket frames.
pub struct LiveEventSink {
    registry: Arc<ClientRegistry>,
}

impl LiveEventSink {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl MessageEventSink for LiveEventSink {
    async fn emit(&self, tenant_id: &str, event: MessageEvent) {
        let name = match &event {
            MessageEvent::MessageStored { .. } => "message.stored",
            MessageEvent::MessageEdited { .. } => "message.edited",
            MessageEvent::ConversationEscalated { .. } => "conversation.escalated",
        };
        let payload = match serde_json::to_value(&event) {
            Ok(p) => p,
            Err(e) => {
                warn!(event = name, error = %e, "failed to serialize message event");
                return;
            },
        };
        self.registry.broadcast(tenant_id, name, payload).await;
    }
}
