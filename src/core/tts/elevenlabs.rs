//! ElevenLabs text-to-speech backend.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://api.elevenlabs.io/v1/text-to-speech/{voice_id}`
//! - Auth: `xi-api-key` header
//! - Query: `output_format` (default `mp3_22050_32`)
//! - Body: `text`, `model_id`, `voice_settings`

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;
use tracing::debug;

use super::base::{SpeechSynthesis, TTSError, TTSResult, read_audio_response};
use crate::core::persona::{ProsodyParams, VoiceBackend, VoiceConfig};

/// ElevenLabs API base URL
pub const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";
pub const DEFAULT_ELEVENLABS_MODEL: &str = "eleven_multilingual_v2";
pub const DEFAULT_ELEVENLABS_OUTPUT_FORMAT: &str = "mp3_22050_32";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub struct ElevenLabsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model_id: String,
    pub output_format: String,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: ELEVENLABS_BASE_URL.to_string(),
            model_id: DEFAULT_ELEVENLABS_MODEL.to_string(),
            output_format: DEFAULT_ELEVENLABS_OUTPUT_FORMAT.to_string(),
        }
    }
}

/// General-purpose backend with prosody controls.
pub struct ElevenLabsTTS {
    client: reqwest::Client,
    config: ElevenLabsConfig,
}

impl ElevenLabsTTS {
    pub fn new(config: ElevenLabsConfig) -> TTSResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TTSError::InvalidConfiguration(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn build_http_request(
        &self,
        text: &str,
        voice_id: &str,
        prosody: &ProsodyParams,
    ) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.config.base_url.trim_end_matches('/'),
            voice_id
        );
        let body = json!({
            "text": text,
            "model_id": self.config.model_id,
            "voice_settings": {
                "stability": prosody.stability,
                "similarity_boost": prosody.similarity_boost,
                "style": prosody.style,
                "use_speaker_boost": prosody.use_speaker_boost,
            },
        });

        let mut request = self
            .client
            .post(url)
            .query(&[("output_format", self.config.output_format.as_str())])
            .header("Accept", "audio/mpeg")
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(ref key) = self.config.api_key {
            request = request.header("xi-api-key", key);
        }
        request
    }
}

#[async_trait]
impl SpeechSynthesis for ElevenLabsTTS {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> TTSResult<Bytes> {
        let VoiceBackend::General(ref prosody) = voice.backend else {
            return Err(TTSError::BackendMismatch {
                backend: self.provider_name(),
                voice_id: voice.voice_id.clone(),
            });
        };

        debug!(voice_id = %voice.voice_id, chars = text.len(), "Requesting ElevenLabs synthesis");
        let response = self
            .build_http_request(text, &voice.voice_id, prosody)
            .send()
            .await
            .map_err(|e| TTSError::RequestFailed(e.to_string()))?;

        read_audio_response(response).await
    }

    fn provider_name(&self) -> &'static str {
        "elevenlabs"
    }
}
