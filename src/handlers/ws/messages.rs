//! Listener WebSocket message types
//!
//! Broadcast events ([`ListenerEvent`]) are forwarded to every socket as-is.
//! The types here cover the control messages a listener may send and the
//! replies addressed to that listener only.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::broadcast::ListenerEvent;
use crate::core::session::SessionStatus;
use crate::core::topic::TopicsSnapshot;

/// Maximum accepted size of a text frame from a listener (16 KB)
pub const MAX_INCOMING_TEXT_SIZE: usize = 16 * 1024;

/// Control messages from a listener
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingMessage {
    StartConversation,
    StopConversation,
    SetTopic { topic: String },
}

/// Replies sent to a single listener
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingMessage {
    /// First message on every socket.
    Connected {
        connection_id: String,
        session: SessionStatus,
    },
    /// `start_conversation` while a session was already running.
    AlreadyRunning { generation: u64 },
    /// `stop_conversation` while nothing was running.
    NotRunning,
    /// Reply to `set_topic`.
    Topics(TopicsSnapshot),
    Error { message: String },
}

/// Anything the sender task may write to the socket
#[derive(Debug)]
pub enum MessageRoute {
    Outgoing(OutgoingMessage),
    Event(Arc<ListenerEvent>),
    Close,
}
