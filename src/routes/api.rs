use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{personas, session, topics};
use crate::state::AppState;
use std::sync::Arc;

/// Create the show control router
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/characters", get(personas::list_characters))
        .route("/get_topics", get(topics::get_topics))
        .route("/set_topic", post(topics::set_topic))
        .route("/session", get(session::session_status))
        .route("/session/start", post(session::start_session))
        .route("/session/stop", post(session::stop_session))
        .layer(TraceLayer::new_for_http())
}
