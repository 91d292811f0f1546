//! Dashboard REST surface: the read endpoints the conversation view
//! consumes, conversation close, and the outbound send path.

use std::sync::Arc;

use {
    axum::{
        Json,
        extract::{Path, Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    serde::Deserialize,
    tracing::warn,
};

use {
    convoy_channels::{Error as ChannelError, MessageKind},
    convoy_pipeline::{OutboundError, OutboundRequest},
};

use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct TenantQuery {
    pub tenant_id: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

fn internal_error(context: &str, e: impl std::fmt::Display) -> Response {
    warn!(error = %e, "{context}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": { "message": "internal error" } })),
    )
        .into_response()
}

/// `GET /api/conversations?tenant_id=...`
pub async fn list_conversations(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<TenantQuery>,
) -> Response {
    match state
        .conversations
        .list_by_tenant(&query.tenant_id, query.limit)
        .await
    {
        Ok(conversations) => Json(conversations).into_response(),
        Err(e) => internal_error("listing conversations failed", e),
    }
}

/// `GET /api/contacts?tenant_id=...`
pub async fn list_contacts(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<TenantQuery>,
) -> Response {
    match state
        .contacts
        .list_by_tenant(&query.tenant_id, query.limit)
        .await
    {
        Ok(contacts) => Json(contacts).into_response(),
        Err(e) => internal_error("listing contacts failed", e),
    }
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// `GET /api/conversations/{id}/messages`
pub async fn list_messages(
    State(state): State<Arc<GatewayState>>,
    Path(conversation_id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> Response {
    match state.conversations.get(&conversation_id).await {
        Ok(Some(_)) => {},
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => return internal_error("loading conversation failed", e),
    }
    match state
        .messages
        .list_by_conversation(&conversation_id, query.limit)
        .await
    {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => internal_error("listing messages failed", e),
    }
}

/// `POST /api/conversations/{id}/close`
pub async fn close_conversation(
    State(state): State<Arc<GatewayState>>,
    Path(conversation_id): Path<String>,
) -> Response {
    match state.conversations.get(&conversation_id).await {
        Ok(Some(_)) => {},
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => return internal_error("loading conversation failed", e),
    }
    match state.conversations.close(&conversation_id).await {
        Ok(closed) => Json(serde_json::json!({ "closed": closed })).into_response(),
        Err(e) => internal_error("closing conversation failed", e),
    }
}

#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    #[serde(default = "default_kind")]
    pub kind: MessageKind,
    pub content: String,
    #[serde(default)]
    pub media_ref: Option<String>,
    #[serde(default)]
    pub reply_to: Option<String>,
}

fn default_kind() -> MessageKind {
    MessageKind::Text
}

/// `POST /api/conversations/{id}/messages` — outbound send.
///
/// Provider rejections come back as 502 with the provider's native code and
/// description, untouched.
pub async fn send_message(
    State(state): State<Arc<GatewayState>>,
    Path(conversation_id): Path<String>,
    Json(body): Json<SendMessageBody>,
) -> Response {
    let conversation = match state.conversations.get(&conversation_id).await {
        Ok(Some(c)) => c,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => return internal_error("loading conversation failed", e),
    };

    let Some(sender) = state.sender_for_tenant(&conversation.tenant_id) else {
        return (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({
                "error": { "message": "no outbound account configured for tenant" }
            })),
        )
            .into_response();
    };

    let request = OutboundRequest {
        kind: body.kind,
        content: body.content,
        media_ref: body.media_ref,
        reply_to: body.reply_to,
    };

    match sender.send(&conversation, request).await {
        Ok(message) => (StatusCode::CREATED, Json(message)).into_response(),
        Err(OutboundError::Channel(ChannelError::Provider { code, message })) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({
                "error": { "code": code, "message": message }
            })),
        )
            .into_response(),
        Err(OutboundError::Channel(e)) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({ "error": { "message": e.to_string() } })),
        )
            .into_response(),
        Err(OutboundError::Storage(e)) => internal_error("outbound pre-registration failed", e),
    }
}
