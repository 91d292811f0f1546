//! Provider webhook routes.
//!
//! Status contract (per provider retry semantics):
//! - 200 — everything in the delivery is durably stored, a recognized
//!   duplicate, or unparseable (retrying malformed input cannot help);
//! - 401 — webhook authentication failed;
//! - 404 — unknown account id;
//! - 503 — at least one event hit a retryable storage failure; the provider
//!   should redeliver the whole payload.

use std::{collections::HashMap, sync::Arc};

use {
    axum::{
        body::Bytes,
        extract::{Path, Query, State},
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
    },
    tracing::{debug, warn},
};

use convoy_channels::Platform;

use crate::state::{AccountAuth, GatewayState};

const TELEGRAM_SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";
const HUB_SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// `POST /webhooks/telegram/{account_id}`
pub async fn telegram_webhook(
    State(state): State<Arc<GatewayState>>,
    Path(account_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(binding) = state.account(Platform::Telegram, &account_id).cloned() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let AccountAuth::Telegram {
        secret_token: Some(expected),
    } = &binding.auth
    {
        let presented = headers
            .get(TELEGRAM_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());
        if presented != Some(expected.as_str()) {
            warn!(account_id, "telegram webhook secret mismatch");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    ingest_body(&state, &binding.tenant_id, binding.connector.as_ref(), &body).await
}

/// `GET /webhooks/whatsapp/{account_id}` — subscription handshake.
pub async fn whatsapp_verify(
    State(state): State<Arc<GatewayState>>,
    Path(account_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(binding) = state.account(Platform::Whatsapp, &account_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let AccountAuth::Whatsapp { verify_token, .. } = &binding.auth else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match convoy_whatsapp::verify_subscription(
        params.get("hub.mode").map(String::as_str),
        params.get("hub.verify_token").map(String::as_str),
        params.get("hub.challenge").map(String::as_str),
        verify_token,
    ) {
        Some(challenge) => {
            debug!(account_id, "whatsapp subscription verified");
            challenge.into_response()
        },
        None => {
            warn!(account_id, "whatsapp subscription verification failed");
            StatusCode::FORBIDDEN.into_response()
        },
    }
}

/// `POST /webhooks/whatsapp/{account_id}`
pub async fn whatsapp_webhook(
    State(state): State<Arc<GatewayState>>,
    Path(account_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(binding) = state.account(Platform::Whatsapp, &account_id).cloned() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let AccountAuth::Whatsapp {
        app_secret: Some(secret),
        ..
    } = &binding.auth
    {
        let signature = headers
            .get(HUB_SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !convoy_whatsapp::verify_signature(&body, signature, secret) {
            warn!(account_id, "whatsapp webhook signature rejected");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    ingest_body(&state, &binding.tenant_id, binding.connector.as_ref(), &body).await
}

/// Parse the raw body and run the batch through the pipeline, mapping the
/// report onto the webhook status contract.
async fn ingest_body(
    state: &GatewayState,
    tenant_id: &str,
    connector: &dyn convoy_channels::ChannelConnector,
    body: &[u8],
) -> Response {
    let raw: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            // Acknowledged, never retried: redelivering bad JSON cannot help.
            warn!(tenant_id, error = %e, "webhook body is not JSON, acknowledging");
            return (
                StatusCode::OK,
                axum::Json(serde_json::json!({ "ok": true, "malformed": 1 })),
            )
                .into_response();
        },
    };

    let report = state.ingestor.ingest_batch(tenant_id, connector, &raw).await;
    let status = if report.retryable() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, axum::Json(report)).into_response()
}
