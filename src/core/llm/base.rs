use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while requesting a chat completion.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure (DNS, TLS, connection reset, timeout)
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Non-success HTTP status from the provider
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// The provider answered without any choice
    #[error("Completion response contained no choices")]
    EmptyChoices,

    /// Body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Model and sampling settings for one kind of completion
/// (dialogue lines, speaker direction, topic generation).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompletionParams {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Default chat model.
pub const DEFAULT_MODEL: &str = "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo";

impl CompletionParams {
    /// Settings for dialogue lines.
    pub fn dialogue() -> Self {
        Self {
            temperature: Some(0.5),
            max_tokens: Some(1000),
            ..Default::default()
        }
    }

    /// Settings for the speaker-selection director.
    pub fn director() -> Self {
        Self {
            temperature: Some(0.5),
            max_tokens: Some(50),
            ..Default::default()
        }
    }

    /// Settings for topic lookahead.
    pub fn topics() -> Self {
        Self {
            model: "meta-llama/Llama-3-70b-chat-hf".to_string(),
            temperature: Some(0.0),
            max_tokens: None,
        }
    }
}

/// Chat-completion capability.
///
/// Implementations return the trimmed content of the first choice.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], params: &CompletionParams)
    -> LlmResult<String>;
}
