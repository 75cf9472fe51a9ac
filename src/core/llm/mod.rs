mod base;
pub mod openai;

pub use base::{
    ChatMessage, ChatRole, CompletionParams, DEFAULT_MODEL, LlmError, LlmResult, TextCompletion,
};
pub use openai::{DEFAULT_LLM_BASE_URL, OpenAICompatibleClient};
