use std::sync::Arc;

use axum::{extract::State, response::Json};

use crate::core::broadcast::StopReason;
use crate::core::session::{SessionStatus, StartOutcome, StopOutcome};
use crate::state::AppState;

pub async fn start_session(State(state): State<Arc<AppState>>) -> Json<StartOutcome> {
    Json(state.session.start())
}

pub async fn stop_session(State(state): State<Arc<AppState>>) -> Json<StopOutcome> {
    Json(state.session.stop(StopReason::Requested))
}

pub async fn session_status(State(state): State<Arc<AppState>>) -> Json<SessionStatus> {
    Json(state.session.status())
}
