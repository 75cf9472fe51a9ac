mod base;
pub mod elevenlabs;
pub mod neets;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

pub use base::{SpeechSynthesis, TTSError, TTSResult};
pub use elevenlabs::{
    DEFAULT_ELEVENLABS_MODEL, DEFAULT_ELEVENLABS_OUTPUT_FORMAT, ELEVENLABS_BASE_URL,
    ElevenLabsConfig, ElevenLabsTTS,
};
pub use neets::{NEETS_BASE_URL, NeetsConfig, NeetsTTS};

use crate::core::persona::{VoiceBackend, VoiceConfig};

/// Dispatches each request to the backend named by the voice's [`VoiceBackend`].
pub struct VoiceRouter {
    fast: Arc<dyn SpeechSynthesis>,
    general: Arc<dyn SpeechSynthesis>,
}

impl VoiceRouter {
    pub fn new(fast: Arc<dyn SpeechSynthesis>, general: Arc<dyn SpeechSynthesis>) -> Self {
        Self { fast, general }
    }

    /// Router over the stock Neets and ElevenLabs clients.
    pub fn from_configs(neets: NeetsConfig, elevenlabs: ElevenLabsConfig) -> TTSResult<Self> {
        Ok(Self::new(
            Arc::new(NeetsTTS::new(neets)?),
            Arc::new(ElevenLabsTTS::new(elevenlabs)?),
        ))
    }

    fn backend_for(&self, voice: &VoiceConfig) -> &Arc<dyn SpeechSynthesis> {
        match voice.backend {
            VoiceBackend::Fast { .. } => &self.fast,
            VoiceBackend::General(_) => &self.general,
        }
    }
}

#[async_trait]
impl SpeechSynthesis for VoiceRouter {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> TTSResult<Bytes> {
        self.backend_for(voice).synthesize(text, voice).await
    }

    fn provider_name(&self) -> &'static str {
        "router"
    }
}
