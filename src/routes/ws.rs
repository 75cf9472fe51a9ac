//! Listener WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::ws::listener_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the listener WebSocket router
///
/// # Endpoint
///
/// `GET /ws` - WebSocket upgrade for show listeners
///
/// # Protocol
///
/// On connect the server sends a `connected` message with the connection id
/// and a session status snapshot. After that every broadcast event is
/// forwarded as JSON:
/// - `audio_segment` with base64 audio and the speaker's metadata
/// - `conversation_started` / `conversation_stopped`
/// - `diagnostic` when a turn was dropped (if enabled)
///
/// Listeners may send `start_conversation`, `stop_conversation` and
/// `set_topic`.
///
/// # Example
///
/// ```json
/// // Client queues a topic
/// {"type": "set_topic", "topic": "Mars colonies"}
///
/// // Server replies
/// {"type": "topics", "topics": ["AI", "Mars colonies"], "current_topic": "AI", "cursor": 0}
/// ```
pub fn create_ws_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(listener_handler))
        .layer(TraceLayer::new_for_http())
}
