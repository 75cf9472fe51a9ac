use serde::Deserialize;
use std::path::PathBuf;

use crate::core::retry::RetryPolicy;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present here
/// override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///
/// llm:
///   base_url: "https://api.together.xyz/v1"
///   api_key: "your-together-key"
///   dialogue:
///     model: "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo"
///     temperature: 0.5
///     max_tokens: 1000
///
/// voices:
///   elevenlabs_api_key: "your-elevenlabs-key"
///   neets_api_key: "your-neets-key"
///
/// content:
///   personas_path: "config/personas.yaml"
///   topics_path: "config/topics.yaml"
///   transcript_log_path: "conversation.json"
///
/// session:
///   grace_period_ms: 10000
///   topic_turns_min: 5
///   topic_turns_max: 10
///   retry:
///     max_attempts: 3
///     base_delay_ms: 4000
///     max_delay_ms: 10000
///
/// security:
///   cors_allowed_origins: "*"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub llm: Option<LlmYaml>,
    pub voices: Option<VoicesYaml>,
    pub content: Option<ContentYaml>,
    pub session: Option<SessionYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// One model profile. Unset fields keep the role's defaults.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CompletionYaml {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LlmYaml {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub dialogue: Option<CompletionYaml>,
    pub director: Option<CompletionYaml>,
    pub topics: Option<CompletionYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VoicesYaml {
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_base_url: Option<String>,
    pub elevenlabs_model: Option<String>,
    pub elevenlabs_output_format: Option<String>,
    pub neets_api_key: Option<String>,
    pub neets_base_url: Option<String>,
    pub fast_voice_id: Option<String>,
    pub fast_model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ContentYaml {
    pub personas_path: Option<String>,
    pub topics_path: Option<String>,
    pub transcript_log_path: Option<String>,
    pub prompt_log_path: Option<String>,
}

/// Session timings from YAML. Durations are in milliseconds.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionYaml {
    pub liveness_poll_ms: Option<u64>,
    pub selection_retry_delay_ms: Option<u64>,
    pub inter_turn_delay_ms: Option<u64>,
    pub grace_period_ms: Option<u64>,
    pub lookahead_interval_ms: Option<u64>,
    pub lookahead_min_remaining: Option<usize>,
    pub lookahead_sample_size: Option<usize>,
    pub topic_turns_min: Option<u32>,
    pub topic_turns_max: Option<u32>,
    pub fault_backoff_cap_ms: Option<u64>,
    pub max_fault_retries: Option<u32>,
    pub context_turns: Option<usize>,
    pub seed_line: Option<String>,
    pub narrator: Option<String>,
    pub emit_diagnostics: Option<bool>,
    pub retry: Option<RetryPolicy>,
    pub audio_retry: Option<RetryPolicy>,
}

/// Security configuration from YAML
///
/// # Example YAML structure
/// ```yaml
/// security:
///   cors_allowed_origins: "https://example.com,https://app.example.com"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
///   max_listener_connections: 1000
///   max_connections_per_ip: 100
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address
    pub rate_limit_requests_per_second: Option<u32>,
    /// Maximum burst size for rate limiting
    pub rate_limit_burst_size: Option<u32>,
    /// Maximum concurrent listener connections
    pub max_listener_connections: Option<usize>,
    /// Maximum connections per IP address
    pub max_connections_per_ip: Option<u32>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
