//! Listener fan-out.
//!
//! Events are pushed into a `tokio::sync::broadcast` channel. Publishing
//! never blocks the producer and never fails because nobody is listening;
//! slow receivers lag and drop events on their side.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::core::pipeline::ProducedTurn;

pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Who a turn belongs to, as shown to listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRef {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMetadata {
    pub text: String,
    pub character: CharacterRef,
}

/// One published turn: base64 audio plus what to display alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnPayload {
    pub audio: String,
    pub metadata: TurnMetadata,
}

impl From<&ProducedTurn> for TurnPayload {
    fn from(turn: &ProducedTurn) -> Self {
        Self {
            audio: BASE64.encode(&turn.audio),
            metadata: TurnMetadata {
                text: turn.text.clone(),
                character: CharacterRef {
                    id: turn.persona.id.clone(),
                    name: turn.persona.display_name.clone(),
                    avatar_url: turn.persona.avatar_url.clone(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Explicit stop command.
    Requested,
    /// Every listener left and none came back within the grace period.
    ListenersGone,
}

/// Event delivered to every connected listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListenerEvent {
    AudioSegment(TurnPayload),
    ConversationStarted,
    ConversationStopped { reason: StopReason },
    /// A turn was dropped. Informational only.
    Diagnostic { stage: String, message: String },
}

impl ListenerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ListenerEvent::AudioSegment(_) => "audio_segment",
            ListenerEvent::ConversationStarted => "conversation_started",
            ListenerEvent::ConversationStopped { .. } => "conversation_stopped",
            ListenerEvent::Diagnostic { .. } => "diagnostic",
        }
    }
}

/// Fire-and-forget sink for listener events.
pub trait TurnPublisher: Send + Sync {
    fn publish(&self, event: ListenerEvent);
}

#[derive(Debug, Clone)]
pub struct BroadcastHub {
    sender: broadcast::Sender<Arc<ListenerEvent>>,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ListenerEvent>> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl TurnPublisher for BroadcastHub {
    fn publish(&self, event: ListenerEvent) {
        let kind = event.kind();
        // Err only means there are no receivers right now
        let delivered = self.sender.send(Arc::new(event)).unwrap_or(0);
        trace!(kind, delivered, "Published listener event");
    }
}
