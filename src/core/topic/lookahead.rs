use std::sync::Arc;

use async_trait::async_trait;

use crate::core::llm::{ChatMessage, CompletionParams, LlmError, LlmResult, TextCompletion};

/// Source of fresh discussion topics.
#[async_trait]
pub trait TopicGenerator: Send + Sync {
    async fn generate_topic(&self, prompt: &str) -> LlmResult<String>;
}

/// Topic generator backed by a chat-completion model.
pub struct LlmTopicGenerator {
    llm: Arc<dyn TextCompletion>,
    params: CompletionParams,
}

impl LlmTopicGenerator {
    pub fn new(llm: Arc<dyn TextCompletion>, params: CompletionParams) -> Self {
        Self { llm, params }
    }
}

#[async_trait]
impl TopicGenerator for LlmTopicGenerator {
    async fn generate_topic(&self, prompt: &str) -> LlmResult<String> {
        let raw = self
            .llm
            .complete(&[ChatMessage::system(prompt)], &self.params)
            .await?;
        let topic = clean_topic(&raw);
        if topic.is_empty() {
            return Err(LlmError::InvalidResponse("empty topic".to_string()));
        }
        Ok(topic)
    }
}

/// Strip whitespace and surrounding quotes from a generated topic.
pub fn clean_topic(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

/// Prompt asking for one new topic, given the participants and a sample of
/// existing topics.
pub fn build_lookahead_prompt(persona_ids: &[String], sample: &[String]) -> String {
    let existing = sample
        .iter()
        .map(|t| format!("- {t}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Given the following topics for the podcast between {participants}, generate a new topic. \
The topic should be interesting and should drive engaging conversation.\n\
Topic should be unique and concise. Do not generate topics that are too similar to the existing topics.\n\
You should only return the new topic and nothing else.\n\
Do not include quotes before or after the topic.\n\n\
topics:\n{existing}\n\n\
Here is the next topic for the podcast:",
        participants = persona_ids.join(", "),
    )
}
