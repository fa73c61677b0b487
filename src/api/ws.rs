//! WebSocket endpoint for real-time chat delivery.
//!
//! The upgrade request is authenticated like any API call. While the socket is
//! open the session is re-checked on every keepalive, so logging out (or the
//! token expiring) also ends live connections that were opened with it.

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket, rejection::WebSocketUpgradeRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::auth::{Auth, AuthValidator, Authenticated, Principal};
use crate::impl_has_auth_backend;
use crate::jwt::unix_now;

/// Default interval between keepalive pings and session re-checks.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

/// State for WebSocket endpoints.
#[derive(Clone)]
pub struct WsState {
    pub validator: AuthValidator,
    pub secure_cookies: bool,
    pub ping_interval: Duration,
}

impl_has_auth_backend!(WsState);

/// Messages sent from server to client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established with user info
    Connected { user: Principal },
    /// Ping to keep connection alive
    Ping,
    /// The session was logged out or expired; the server closes the socket
    SessionRevoked,
    /// Error message
    Error { message: String },
}

pub fn router(state: WsState) -> Router {
    Router::new().route("/", get(ws_handler)).with_state(state)
}

async fn ws_handler(
    State(state): State<WsState>,
    Auth(auth): Auth,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        Err(_) => {
            return (StatusCode::BAD_REQUEST, "Expected WebSocket upgrade").into_response();
        }
    };

    let validator = state.validator.clone();
    let ping_interval = state.ping_interval;
    ws.on_upgrade(move |socket| handle_socket(socket, auth, validator, ping_interval))
}

/// Whether the session behind `auth` may keep its socket open.
async fn session_still_valid(validator: &AuthValidator, auth: &Authenticated) -> bool {
    let Ok(now) = unix_now() else {
        return false;
    };
    match validator.recheck(auth, now).await {
        Ok(()) => true,
        Err(kind) => {
            info!(user_id = auth.principal.id, reason = %kind, "Closing WebSocket session");
            false
        }
    }
}

async fn handle_socket(
    socket: WebSocket,
    auth: Authenticated,
    validator: AuthValidator,
    ping_interval: Duration,
) {
    let (mut sender, mut receiver) = socket.split();
    let user_id = auth.principal.id;

    // Send connected message with user info
    let connected_msg = ServerMessage::Connected {
        user: auth.principal.clone(),
    };
    if let Ok(json) = serde_json::to_string(&connected_msg) {
        if sender.send(Message::Text(json.into())).await.is_err() {
            return;
        }
    }

    // Create channel for sending messages
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);

    // Spawn task to forward messages to WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let close = matches!(msg, ServerMessage::SessionRevoked);
            if let Ok(json) = serde_json::to_string(&msg) {
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            if close {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    });

    // Keepalive, re-checking the session before each ping
    let tx_ping = tx.clone();
    let mut ping_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(ping_interval);
        interval.tick().await;
        loop {
            interval.tick().await;
            if !session_still_valid(&validator, &auth).await {
                let _ = tx_ping.send(ServerMessage::SessionRevoked).await;
                break;
            }
            if tx_ping.send(ServerMessage::Ping).await.is_err() {
                break;
            }
        }
    });

    // Handle incoming messages
    let tx_recv = tx;
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(_) => {
                    // Chat payloads are handled by the room layer
                }
                Message::Binary(_) => {
                    warn!(user_id, "Unexpected binary WebSocket frame");
                    let _ = tx_recv
                        .send(ServerMessage::Error {
                            message: "Binary frames are not supported".to_string(),
                        })
                        .await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // The ping task finishing after a revocation must not cut off the final
    // message, so wait for the sender in that case.
    tokio::select! {
        _ = &mut send_task => {},
        _ = &mut recv_task => {},
        _ = &mut ping_task => {
            let _ = tokio::time::timeout(Duration::from_secs(5), &mut send_task).await;
        },
    }

    // Clean up
    send_task.abort();
    recv_task.abort();
    ping_task.abort();

    info!(user_id, "WebSocket disconnected");
}
