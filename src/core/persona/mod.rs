//! Persona registry.
//!
//! The roster is loaded once at startup and shared read-only afterwards. Each
//! persona's voice is resolved into a [`VoiceBackend`] at load time so the
//! generation pipeline never has to inspect raw voice ids.
//!
//! # Example roster
//! ```yaml
//! personas:
//!   - id: "Frank Degods"
//!     avatar_url: "https://cdn.example.com/frank.png"
//!     description: "A founder who cannot stop talking about his NFT project."
//!     voice_id: "x86uQqNKUBgPBwbii6G0"
//!     mouth_positions:
//!       closed: "https://cdn.example.com/frank_closed.png"
//!       open: "https://cdn.example.com/frank_open.png"
//!   - id: "Joe Rogan"
//!     voice_id: "joe-rogan"
//!     description: "Host of the show."
//! ```

mod voice;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub use voice::{
    CURATED_PRESET_VOICE, DEFAULT_FAST_MODEL, FAST_VOICE_SENTINEL, ProsodyParams, VoiceBackend,
    VoiceConfig, VoiceDefaults,
};

/// Errors raised while loading the roster. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("Failed to read roster file {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse roster: {0}")]
    Parse(String),

    #[error("Roster contains no personas")]
    EmptyRoster,

    #[error("Duplicate persona id: {0}")]
    DuplicateId(String),

    #[error("Invalid persona '{id}': {reason}")]
    InvalidProfile { id: String, reason: String },
}

pub type PersonaResult<T> = Result<T, PersonaError>;

/// An immutable persona profile.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonaProfile {
    /// Roster key. Also the name the director model answers with.
    pub id: String,
    pub display_name: String,
    /// Free-form personality text injected into the dialogue system prompt.
    pub description: String,
    pub avatar_url: Option<String>,
    pub voice: VoiceConfig,
    /// Named mouth frames used by listeners to animate the avatar.
    pub mouth_positions: BTreeMap<String, String>,
}

/// Public view of a persona served to listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaSummary {
    pub name: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub description: String,
    pub mouth_positions: BTreeMap<String, String>,
}

impl From<&PersonaProfile> for PersonaSummary {
    fn from(profile: &PersonaProfile) -> Self {
        Self {
            name: profile.id.clone(),
            display_name: profile.display_name.clone(),
            avatar_url: profile.avatar_url.clone(),
            description: profile.description.clone(),
            mouth_positions: profile.mouth_positions.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RosterFile {
    personas: Vec<RosterEntry>,
}

#[derive(Debug, Deserialize)]
struct RosterEntry {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    avatar_url: Option<String>,
    voice_id: String,
    #[serde(default)]
    prosody: Option<ProsodyParams>,
    #[serde(default)]
    mouth_positions: BTreeMap<String, String>,
}

impl RosterEntry {
    fn into_profile(self, defaults: &VoiceDefaults) -> PersonaResult<PersonaProfile> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return Err(PersonaError::InvalidProfile {
                id: self.id,
                reason: "id must not be empty".to_string(),
            });
        }
        if self.voice_id.trim().is_empty() {
            return Err(PersonaError::InvalidProfile {
                id,
                reason: "voice_id must not be empty".to_string(),
            });
        }

        let display_name = self
            .display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| id.clone());

        Ok(PersonaProfile {
            voice: VoiceConfig::resolve(self.voice_id.trim(), self.prosody, defaults),
            id,
            display_name,
            description: self.description,
            avatar_url: self.avatar_url,
            mouth_positions: self.mouth_positions,
        })
    }
}

/// Immutable mapping from persona id to profile, in roster order.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    ids: Vec<String>,
    profiles: HashMap<String, Arc<PersonaProfile>>,
}

impl PersonaRegistry {
    /// Build a registry from already-resolved profiles.
    pub fn new(profiles: Vec<PersonaProfile>) -> PersonaResult<Self> {
        if profiles.is_empty() {
            return Err(PersonaError::EmptyRoster);
        }

        let mut ids = Vec::with_capacity(profiles.len());
        let mut map = HashMap::with_capacity(profiles.len());
        for profile in profiles {
            if map.contains_key(&profile.id) {
                return Err(PersonaError::DuplicateId(profile.id));
            }
            ids.push(profile.id.clone());
            map.insert(profile.id.clone(), Arc::new(profile));
        }

        Ok(Self { ids, profiles: map })
    }

    /// Parse a roster document.
    pub fn from_yaml_str(contents: &str, defaults: &VoiceDefaults) -> PersonaResult<Self> {
        let roster: RosterFile =
            serde_yaml::from_str(contents).map_err(|e| PersonaError::Parse(e.to_string()))?;

        let profiles = roster
            .personas
            .into_iter()
            .map(|entry| entry.into_profile(defaults))
            .collect::<PersonaResult<Vec<_>>>()?;

        Self::new(profiles)
    }

    /// Load a roster file. JSON rosters are accepted too since they parse as YAML.
    pub fn from_file(path: &Path, defaults: &VoiceDefaults) -> PersonaResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| PersonaError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let registry = Self::from_yaml_str(&contents, defaults)?;
        info!(
            path = %path.display(),
            personas = registry.len(),
            "Loaded persona roster"
        );
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<PersonaProfile>> {
        self.profiles.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.profiles.contains_key(id)
    }

    /// Persona ids in roster order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Always false for a constructed registry.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PersonaProfile>> {
        self.ids.iter().filter_map(|id| self.profiles.get(id))
    }

    pub fn summaries(&self) -> Vec<PersonaSummary> {
        self.iter().map(|p| PersonaSummary::from(p.as_ref())).collect()
    }
}
