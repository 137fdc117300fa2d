//! WebSocket route handler
//!
//! Upgrades connections and bridges them onto the notification hub: each
//! client subscribes to ticker/trades/alerts channels and receives only
//! the broadcast messages matching its subscriptions.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use paper_core::{ClientMessage, ErrorCode, ServerMessage, SubscriptionKey};
use paper_services::{BroadcastMessage, ClientId, NotificationHub};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::AppState;

/// Create WebSocket routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let hub = Arc::clone(&state.hub);
    let client_id = hub.register_client();
    info!("New WebSocket connection: client {}", client_id);

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let mut broadcast_rx = hub.receiver();

    // Outgoing queue so both the broadcast forwarder and the message
    // handler can reply to this client
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<ServerMessage>(100);

    // Task: forward subscribed broadcast messages to this client
    let hub_for_broadcast = Arc::clone(&hub);
    let outgoing_for_broadcast = outgoing_tx.clone();
    let forward_task = tokio::spawn(async move {
        loop {
            match broadcast_rx.recv().await {
                Ok(BroadcastMessage { key, message }) => {
                    if hub_for_broadcast.is_subscribed(client_id, &key)
                        && outgoing_for_broadcast.send(message).await.is_err()
                    {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Client {} lagged {} messages", client_id, n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Task: serialize and send outgoing messages
    let send_task = tokio::spawn(async move {
        while let Some(message) = outgoing_rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(j) => j,
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Receive and process incoming messages until the client goes away
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                handle_text(client_id, &text, &hub, &outgoing_tx).await;
            }
            Ok(Message::Close(_)) => {
                debug!("Client {} sent close", client_id);
                break;
            }
            Ok(_) => {} // binary/ping/pong: nothing to do
            Err(e) => {
                debug!("WebSocket error for client {}: {}", client_id, e);
                break;
            }
        }
    }

    hub.remove_client(client_id);
    forward_task.abort();
    send_task.abort();
    info!("WebSocket connection closed: client {}", client_id);
}

/// Parse and act on one text frame from a client
async fn handle_text(
    client_id: ClientId,
    text: &str,
    hub: &Arc<NotificationHub>,
    outgoing: &mpsc::Sender<ServerMessage>,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            debug!("Invalid message from client {}: {}", client_id, e);
            let _ = outgoing
                .send(ServerMessage::Error {
                    code: ErrorCode::InvalidMessage,
                    message: format!("Failed to parse message: {}", e),
                })
                .await;
            return;
        }
    };

    match message {
        ClientMessage::Subscribe { channel } => {
            let key = SubscriptionKey::from(&channel);
            hub.subscribe(client_id, key);
            debug!("Client {} subscribed to {:?}", client_id, channel);
            let _ = outgoing.send(ServerMessage::Subscribed { channel }).await;
        }
        ClientMessage::Unsubscribe { channel } => {
            let key = SubscriptionKey::from(&channel);
            hub.unsubscribe(client_id, &key);
            debug!("Client {} unsubscribed from {:?}", client_id, channel);
            let _ = outgoing
                .send(ServerMessage::Unsubscribed { channel })
                .await;
        }
        ClientMessage::Ping { timestamp } => {
            let _ = outgoing
                .send(ServerMessage::Pong {
                    client_timestamp: timestamp,
                    server_timestamp: Utc::now().timestamp_millis(),
                })
                .await;
        }
    }
}
