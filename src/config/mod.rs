//! Configuration module for the Botcast gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//! The configuration is split into logical submodules for maintainability.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use botcast_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

use crate::core::llm::{CompletionParams, DEFAULT_LLM_BASE_URL};
use crate::core::persona::{DEFAULT_FAST_MODEL, FAST_VOICE_SENTINEL, VoiceDefaults};
use crate::core::session::SessionSettings;
use crate::core::tts::{
    DEFAULT_ELEVENLABS_MODEL, DEFAULT_ELEVENLABS_OUTPUT_FORMAT, ELEVENLABS_BASE_URL,
    ElevenLabsConfig, NEETS_BASE_URL, NeetsConfig,
};

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Chat-completion endpoint and per-role model settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API
    /// Default: https://api.together.xyz/v1
    pub base_url: String,
    pub api_key: Option<String>,
    /// Dialogue lines
    pub dialogue: CompletionParams,
    /// Speaker selection
    pub director: CompletionParams,
    /// Topic lookahead
    pub topics: CompletionParams,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            api_key: None,
            dialogue: CompletionParams::dialogue(),
            director: CompletionParams::director(),
            topics: CompletionParams::topics(),
        }
    }
}

/// Speech backends.
#[derive(Debug, Clone)]
pub struct VoicesConfig {
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_base_url: String,
    pub elevenlabs_model: String,
    pub elevenlabs_output_format: String,
    pub neets_api_key: Option<String>,
    pub neets_base_url: String,
    /// Roster voice id routed to the fast backend
    /// Default: "joe-rogan"
    pub fast_voice_id: String,
    /// Model requested from the fast backend
    /// Default: "ar-diff-50k"
    pub fast_model: String,
}

impl Default for VoicesConfig {
    fn default() -> Self {
        Self {
            elevenlabs_api_key: None,
            elevenlabs_base_url: ELEVENLABS_BASE_URL.to_string(),
            elevenlabs_model: DEFAULT_ELEVENLABS_MODEL.to_string(),
            elevenlabs_output_format: DEFAULT_ELEVENLABS_OUTPUT_FORMAT.to_string(),
            neets_api_key: None,
            neets_base_url: NEETS_BASE_URL.to_string(),
            fast_voice_id: FAST_VOICE_SENTINEL.to_string(),
            fast_model: DEFAULT_FAST_MODEL.to_string(),
        }
    }
}

/// Show content: who talks and about what.
#[derive(Debug, Clone)]
pub struct ContentConfig {
    /// Persona roster (YAML)
    /// Default: config/personas.yaml
    pub personas_path: PathBuf,
    /// Initial topic list (YAML)
    /// Default: config/topics.yaml
    pub topics_path: PathBuf,
    /// Append-only JSON transcript. Disabled when None.
    pub transcript_log_path: Option<PathBuf>,
    /// Last prompt sent for a dialogue line. Disabled when None.
    pub prompt_log_path: Option<PathBuf>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            personas_path: PathBuf::from("config/personas.yaml"),
            topics_path: PathBuf::from("config/topics.yaml"),
            transcript_log_path: None,
            prompt_log_path: None,
        }
    }
}

/// Server configuration
///
/// Contains all configuration needed to run the Botcast gateway, including:
/// - Server settings (host, port, TLS)
/// - LLM endpoint and model profiles
/// - Speech backend credentials
/// - Show content paths
/// - Session timings
/// - Security settings (CORS, rate limiting, connection limits)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    pub llm: LlmConfig,
    pub voices: VoicesConfig,
    pub content: ContentConfig,
    pub session: SessionSettings,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,

    // Rate limiting configuration
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,

    // Connection limits
    /// Maximum concurrent listener WebSocket connections
    /// Default: None (unlimited)
    pub max_listener_connections: Option<usize>,
    /// Maximum connections per IP address
    /// Default: 100
    pub max_connections_per_ip: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            tls: None,
            llm: LlmConfig::default(),
            voices: VoicesConfig::default(),
            content: ContentConfig::default(),
            session: SessionSettings::default(),
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
            max_listener_connections: None,
            max_connections_per_ip: 100,
        }
    }
}

/// Zeroize every credential when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.llm.api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.voices.elevenlabs_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.voices.neets_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (and defaults).
    ///
    /// The .env file is loaded in `main` before this is called, so its values
    /// are visible here as regular environment variables.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    ///
    /// Returns true if TLS configuration is present
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// How roster voice ids map onto backends.
    pub fn voice_defaults(&self) -> VoiceDefaults {
        VoiceDefaults {
            fast_voice_id: self.voices.fast_voice_id.clone(),
            fast_model: self.voices.fast_model.clone(),
        }
    }

    pub fn elevenlabs_config(&self) -> ElevenLabsConfig {
        ElevenLabsConfig {
            api_key: self.voices.elevenlabs_api_key.clone(),
            base_url: self.voices.elevenlabs_base_url.clone(),
            model_id: self.voices.elevenlabs_model.clone(),
            output_format: self.voices.elevenlabs_output_format.clone(),
        }
    }

    pub fn neets_config(&self) -> NeetsConfig {
        NeetsConfig {
            api_key: self.voices.neets_api_key.clone(),
            base_url: self.voices.neets_base_url.clone(),
        }
    }
}
