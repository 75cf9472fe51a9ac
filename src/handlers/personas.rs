use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::core::persona::PersonaSummary;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CharactersResponse {
    pub characters: Vec<PersonaSummary>,
}

/// List the roster in load order.
pub async fn list_characters(State(state): State<Arc<AppState>>) -> Json<CharactersResponse> {
    Json(CharactersResponse {
        characters: state.session.personas(),
    })
}
