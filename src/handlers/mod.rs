//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `personas` - Roster listing
//! - `session` - Start, stop and status of the show
//! - `topics` - Topic list and topic injection
//! - `ws` - Listener WebSocket

pub mod api;
pub mod personas;
pub mod session;
pub mod topics;
pub mod ws;

pub use ws::listener_handler;
