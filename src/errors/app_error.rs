use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::core::llm::LlmError;
use crate::core::persona::PersonaError;
use crate::core::session::SessionError;
use crate::core::topic::TopicError;
use crate::core::tts::TTSError;

/// Application-level error returned by handlers and startup.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Persona(#[from] PersonaError),

    #[error(transparent)]
    Topic(#[from] TopicError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Tts(#[from] TTSError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Session(_) => StatusCode::BAD_REQUEST,
            AppError::Llm(_) | AppError::Tts(_) => StatusCode::BAD_GATEWAY,
            AppError::Persona(_)
            | AppError::Topic(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
