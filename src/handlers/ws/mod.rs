//! Listener WebSocket endpoint.

pub mod handler;
pub mod messages;
pub mod processor;

pub use handler::listener_handler;
pub use messages::{IncomingMessage, MessageRoute, OutgoingMessage};
