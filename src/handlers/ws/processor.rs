//! Listener message processing
//!
//! Turns raw frames into [`IncomingMessage`]s and applies them to the
//! session. Every reply goes back through the connection's sender channel.

use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::broadcast::StopReason;
use crate::core::session::{StartOutcome, StopOutcome};
use crate::state::AppState;

use super::messages::{IncomingMessage, MAX_INCOMING_TEXT_SIZE, MessageRoute, OutgoingMessage};

/// Process one frame from a listener.
///
/// Returns `false` when the connection should be closed.
pub async fn process_message(
    msg: Message,
    message_tx: &mpsc::Sender<MessageRoute>,
    app_state: &Arc<AppState>,
) -> bool {
    match msg {
        Message::Text(text) => {
            if text.len() > MAX_INCOMING_TEXT_SIZE {
                warn!(len = text.len(), "Listener message too large");
                send_error(
                    message_tx,
                    format!(
                        "Message too large: {} bytes (max {MAX_INCOMING_TEXT_SIZE})",
                        text.len()
                    ),
                )
                .await;
                return true;
            }

            let incoming: IncomingMessage = match serde_json::from_str(&text) {
                Ok(msg) => msg,
                Err(e) => {
                    debug!("Failed to parse listener message: {}", e);
                    send_error(message_tx, format!("Invalid message format: {e}")).await;
                    return true;
                }
            };

            handle_incoming_message(incoming, message_tx, app_state).await
        }
        Message::Binary(data) => {
            debug!(len = data.len(), "Ignoring binary frame from listener");
            true
        }
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            info!("Listener sent close frame");
            false
        }
    }
}

/// Apply a parsed control message to the session.
pub async fn handle_incoming_message(
    msg: IncomingMessage,
    message_tx: &mpsc::Sender<MessageRoute>,
    app_state: &Arc<AppState>,
) -> bool {
    let reply = match msg {
        IncomingMessage::StartConversation => match app_state.session.start() {
            // Every listener hears `conversation_started` from the hub
            StartOutcome::Started { .. } => None,
            StartOutcome::AlreadyRunning { generation } => {
                Some(OutgoingMessage::AlreadyRunning { generation })
            }
        },
        IncomingMessage::StopConversation => match app_state.session.stop(StopReason::Requested) {
            StopOutcome::Stopped => None,
            StopOutcome::NotRunning => Some(OutgoingMessage::NotRunning),
        },
        IncomingMessage::SetTopic { topic } => match app_state.session.set_topic(&topic) {
            Ok(snapshot) => Some(OutgoingMessage::Topics(snapshot)),
            Err(e) => Some(OutgoingMessage::Error {
                message: e.to_string(),
            }),
        },
    };

    if let Some(reply) = reply
        && message_tx.send(MessageRoute::Outgoing(reply)).await.is_err()
    {
        return false;
    }
    true
}

async fn send_error(message_tx: &mpsc::Sender<MessageRoute>, message: String) {
    let _ = message_tx
        .send(MessageRoute::Outgoing(OutgoingMessage::Error { message }))
        .await;
}
