//! WebSocket endpoint: one connection per dashboard view, scoped to a
//! tenant. Frames flow one way (server → client); inbound frames are
//! ignored apart from close.

use std::{collections::HashMap, sync::Arc};

use {
    axum::{
        extract::{
            Query, State, WebSocketUpgrade,
            ws::{Message, WebSocket},
        },
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    futures::{SinkExt, stream::StreamExt},
    tokio::sync::mpsc,
    tracing::{debug, info},
};

use crate::{
    broadcast::ConnectedClient,
    state::GatewayState,
};

/// `GET /ws?tenant={tenant_id}`
pub async fn ws_upgrade_handler(
    State(state): State<Arc<GatewayState>>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(tenant_id) = params.get("tenant").cloned() else {
        return (StatusCode::BAD_REQUEST, "missing tenant parameter").into_response();
    };
    ws.on_upgrade(move |socket| handle_connection(socket, state, tenant_id))
}

async fn handle_connection(socket: WebSocket, state: Arc<GatewayState>, tenant_id: String) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    info!(conn_id = %conn_id, tenant_id, "ws: subscriber connected");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (client_tx, mut client_rx) = mpsc::unbounded_channel::<String>();

    // Write loop: frames from the registry → socket.
    let write_conn_id = conn_id.clone();
    let write_handle = tokio::spawn(async move {
        while let Some(frame) = client_rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                debug!(conn_id = %write_conn_id, "ws: write loop closed");
                break;
            }
        }
    });

    state
        .clients
        .register(ConnectedClient {
            conn_id: conn_id.clone(),
            tenant_id,
            sender: client_tx,
        })
        .await;

    // Read loop: the stream is push-only, so inbound frames are drained
    // until the peer goes away.
    while let Some(message) = ws_rx.next().await {
        match message {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {},
        }
    }

    state.clients.remove(&conn_id).await;
    write_handle.abort();
    info!(conn_id = %conn_id, "ws: subscriber disconnected");
}
