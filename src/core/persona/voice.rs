use serde::{Deserialize, Serialize};

/// Voice id that routes a persona to the rapid synthesis backend.
pub const FAST_VOICE_SENTINEL: &str = "joe-rogan";

/// Model parameter sent to the rapid backend.
pub const DEFAULT_FAST_MODEL: &str = "ar-diff-50k";

/// Voice id that gets the curated prosody preset instead of the default one.
pub const CURATED_PRESET_VOICE: &str = "x86uQqNKUBgPBwbii6G0";

/// Prosody settings understood by the general-purpose backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProsodyParams {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for ProsodyParams {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.8,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

impl ProsodyParams {
    /// Preset used by [`CURATED_PRESET_VOICE`].
    pub fn curated() -> Self {
        Self {
            stability: 0.8,
            similarity_boost: 0.7,
            style: 0.3,
            use_speaker_boost: true,
        }
    }
}

/// Which synthesis backend renders a persona, with the parameters it needs.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceBackend {
    /// Rapid backend with a fixed model.
    Fast { model: String },
    /// General-purpose backend with prosody controls.
    General(ProsodyParams),
}

impl VoiceBackend {
    pub fn name(&self) -> &'static str {
        match self {
            VoiceBackend::Fast { .. } => "fast",
            VoiceBackend::General(_) => "general",
        }
    }
}

/// How voice ids are mapped onto backends when a roster is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceDefaults {
    pub fast_voice_id: String,
    pub fast_model: String,
}

impl Default for VoiceDefaults {
    fn default() -> Self {
        Self {
            fast_voice_id: FAST_VOICE_SENTINEL.to_string(),
            fast_model: DEFAULT_FAST_MODEL.to_string(),
        }
    }
}

/// Resolved voice of a persona.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceConfig {
    pub voice_id: String,
    pub backend: VoiceBackend,
}

impl VoiceConfig {
    /// Resolve a voice id into a backend.
    ///
    /// The sentinel id selects the rapid backend. Every other id goes to the
    /// general backend, using the roster's prosody override if there is one,
    /// then the curated preset, then the default preset.
    pub fn resolve(
        voice_id: &str,
        prosody_override: Option<ProsodyParams>,
        defaults: &VoiceDefaults,
    ) -> Self {
        let backend = if voice_id == defaults.fast_voice_id {
            VoiceBackend::Fast {
                model: defaults.fast_model.clone(),
            }
        } else if let Some(prosody) = prosody_override {
            VoiceBackend::General(prosody)
        } else if voice_id == CURATED_PRESET_VOICE {
            VoiceBackend::General(ProsodyParams::curated())
        } else {
            VoiceBackend::General(ProsodyParams::default())
        };

        Self {
            voice_id: voice_id.to_string(),
            backend,
        }
    }
}
