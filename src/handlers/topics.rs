//! Topic list endpoints.

use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};

use crate::core::topic::TopicsSnapshot;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetTopicRequest {
    pub topic: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SetTopicResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub snapshot: TopicsSnapshot,
}

pub async fn get_topics(State(state): State<Arc<AppState>>) -> Json<TopicsSnapshot> {
    Json(state.session.topics())
}

/// Queue a topic right after the current one.
pub async fn set_topic(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetTopicRequest>,
) -> AppResult<Json<SetTopicResponse>> {
    let topic = request
        .topic
        .ok_or_else(|| AppError::BadRequest("missing field `topic`".to_string()))?;
    let snapshot = state.session.set_topic(&topic)?;
    Ok(Json(SetTopicResponse {
        status: "success",
        snapshot,
    }))
}
