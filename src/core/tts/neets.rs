//! Neets rapid text-to-speech backend.
//!
//! `POST {base_url}/v1/tts` with an `X-API-KEY` header and a body of
//! `{text, voice_id, params: {model}}`. Returns encoded audio.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;
use tracing::debug;

use super::base::{SpeechSynthesis, TTSError, TTSResult, read_audio_response};
use crate::core::persona::{VoiceBackend, VoiceConfig};

/// Neets API base URL
pub const NEETS_BASE_URL: &str = "https://api.neets.ai";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub struct NeetsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for NeetsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: NEETS_BASE_URL.to_string(),
        }
    }
}

pub struct NeetsTTS {
    client: reqwest::Client,
    config: NeetsConfig,
}

impl NeetsTTS {
    pub fn new(config: NeetsConfig) -> TTSResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TTSError::InvalidConfiguration(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn build_http_request(&self, text: &str, voice_id: &str, model: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/v1/tts", self.config.base_url.trim_end_matches('/'));
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(&json!({
                "text": text,
                "voice_id": voice_id,
                "params": { "model": model },
            }));
        if let Some(ref key) = self.config.api_key {
            request = request.header("X-API-KEY", key);
        }
        request
    }
}

#[async_trait]
impl SpeechSynthesis for NeetsTTS {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> TTSResult<Bytes> {
        let VoiceBackend::Fast { ref model } = voice.backend else {
            return Err(TTSError::BackendMismatch {
                backend: self.provider_name(),
                voice_id: voice.voice_id.clone(),
            });
        };

        debug!(voice_id = %voice.voice_id, model = %model, "Requesting Neets synthesis");
        let response = self
            .build_http_request(text, &voice.voice_id, model)
            .send()
            .await
            .map_err(|e| TTSError::RequestFailed(e.to_string()))?;

        read_audio_response(response).await
    }

    fn provider_name(&self) -> &'static str {
        "neets"
    }
}
