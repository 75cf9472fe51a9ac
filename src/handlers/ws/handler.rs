//! Listener WebSocket handler
//!
//! Each socket is registered with the session's connection tracker for as
//! long as it is open and receives every broadcast event. Listeners may also
//! send control messages (see [`IncomingMessage`](super::messages::IncomingMessage)).

use std::net::IpAddr;
use std::sync::Arc;

use axum::{
    Extension,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::select;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::middleware::ClientIp;
use crate::state::AppState;

use super::messages::{MessageRoute, OutgoingMessage};
use super::processor::process_message;

/// Channel buffer between the socket loop and the sender task
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Maximum WebSocket frame size (64 KB)
const MAX_WS_FRAME_SIZE: usize = 64 * 1024;

/// Maximum WebSocket message size (64 KB)
const MAX_WS_MESSAGE_SIZE: usize = 64 * 1024;

/// Upgrade a listener connection.
///
/// When the connection limit middleware admitted the request it attaches a
/// [`ClientIp`]; the slot is released when the socket closes or the upgrade
/// fails.
pub async fn listener_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    client_ip: Option<Extension<ClientIp>>,
) -> Response {
    let client_ip = client_ip.map(|Extension(ClientIp(ip))| ip);
    debug!(ip = ?client_ip, "Listener WebSocket upgrade requested");

    let failed_state = Arc::clone(&state);
    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_failed_upgrade(move |e| {
            warn!("Listener WebSocket upgrade failed: {}", e);
            if let Some(ip) = client_ip {
                failed_state.release_connection(ip);
            }
        })
        .on_upgrade(move |socket| handle_listener_socket(socket, state, client_ip))
}

async fn handle_listener_socket(
    socket: WebSocket,
    app_state: Arc<AppState>,
    client_ip: Option<IpAddr>,
) {
    let connection_id = Uuid::new_v4().to_string();
    info!(%connection_id, ip = ?client_ip, "Listener connected");

    let (mut sender, mut receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<MessageRoute>(CHANNEL_BUFFER_SIZE);

    // Subscribe before registering so nothing published in between is missed
    let mut events = app_state.hub.subscribe();
    app_state.session.on_connect(&connection_id);

    let sender_task = tokio::spawn(async move {
        while let Some(route) = message_rx.recv().await {
            let json = match route {
                MessageRoute::Outgoing(message) => serde_json::to_string(&message),
                MessageRoute::Event(event) => serde_json::to_string(event.as_ref()),
                MessageRoute::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };

            let json = match json {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize listener message: {}", e);
                    continue;
                }
            };

            if let Err(e) = sender.send(Message::Text(json.into())).await {
                debug!("Failed to send to listener: {}", e);
                break;
            }
        }
    });

    let welcome = OutgoingMessage::Connected {
        connection_id: connection_id.clone(),
        session: app_state.session.status(),
    };
    let _ = message_tx.send(MessageRoute::Outgoing(welcome)).await;

    loop {
        select! {
            msg_result = receiver.next() => {
                match msg_result {
                    Some(Ok(msg)) => {
                        if !process_message(msg, &message_tx, &app_state).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(%connection_id, "Listener WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        debug!(%connection_id, "Listener stream ended");
                        break;
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if message_tx.send(MessageRoute::Event(event)).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%connection_id, skipped, "Listener lagging, events dropped");
                    }
                    Err(RecvError::Closed) => {
                        let _ = message_tx.send(MessageRoute::Close).await;
                        break;
                    }
                }
            }
        }
    }

    // Cleanup
    app_state.session.on_disconnect(&connection_id);
    if let Some(ip) = client_ip {
        app_state.release_connection(ip);
    }
    sender_task.abort();

    info!(%connection_id, "Listener disconnected");
}
