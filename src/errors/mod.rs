//! Error types surfaced by the HTTP layer.
//!
//! Component errors (`LlmError`, `TTSError`, `PersonaError`, ...) live next to
//! their components; `AppError` wraps them and maps each onto a status code.

pub mod app_error;

pub use app_error::{AppError, AppResult};
