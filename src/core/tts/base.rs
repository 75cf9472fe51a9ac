use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::core::persona::VoiceConfig;

/// Errors that can occur during speech synthesis.
#[derive(Debug, Error)]
pub enum TTSError {
    /// Transport-level failure
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Non-success HTTP status from the provider
    #[error("Provider error ({status}): {message}")]
    ProviderError { status: u16, message: String },

    /// Provider answered 2xx with no audio
    #[error("Provider returned an empty audio body")]
    EmptyAudio,

    /// Voice was routed to a backend that cannot render it
    #[error("Backend {backend} cannot render voice {voice_id}")]
    BackendMismatch {
        backend: &'static str,
        voice_id: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type TTSResult<T> = Result<T, TTSError>;

/// Text-to-speech capability: render `text` with `voice` into an encoded audio clip.
#[async_trait]
pub trait SpeechSynthesis: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> TTSResult<Bytes>;

    /// Short provider name for logs.
    fn provider_name(&self) -> &'static str;
}

/// Turn a provider HTTP response into audio bytes, mapping failures.
pub(crate) async fn read_audio_response(response: reqwest::Response) -> TTSResult<Bytes> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(TTSError::ProviderError {
            status: status.as_u16(),
            message,
        });
    }

    let audio = response
        .bytes()
        .await
        .map_err(|e| TTSError::RequestFailed(e.to_string()))?;
    if audio.is_empty() {
        return Err(TTSError::EmptyAudio);
    }
    Ok(audio)
}
