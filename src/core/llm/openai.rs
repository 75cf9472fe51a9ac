//! OpenAI-compatible chat completions client.
//!
//! Works against any endpoint that implements `POST {base_url}/chat/completions`
//! (OpenAI, Together, DeepInfra, OpenRouter, vLLM).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::base::{ChatMessage, CompletionParams, LlmError, LlmResult, TextCompletion};

/// Default API base URL
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.together.xyz/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completion client for OpenAI-compatible APIs.
#[derive(Clone)]
pub struct OpenAICompatibleClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAICompatibleClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> LlmResult<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(LlmError::InvalidConfiguration(
                "LLM base URL must not be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::InvalidConfiguration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> reqwest::RequestBuilder {
        let mut body = json!({
            "model": params.model,
            "messages": messages,
        });
        if let Some(temperature) = params.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = params.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        let mut request = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(ref key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }
        request
    }
}

#[async_trait]
impl TextCompletion for OpenAICompatibleClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> LlmResult<String> {
        debug!(model = %params.model, messages = messages.len(), "Requesting chat completion");

        let response = self
            .build_request(messages, params)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let choice = body.choices.into_iter().next().ok_or(LlmError::EmptyChoices)?;
        Ok(choice.message.content.unwrap_or_default().trim().to_string())
    }
}
