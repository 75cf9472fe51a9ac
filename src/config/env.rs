use std::path::PathBuf;

use super::utils::{env_bool, env_millis, env_parse, env_string};
use super::{ServerConfig, TlsConfig};

/// Build a configuration from defaults overridden by environment variables.
pub(super) fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = ServerConfig::default();

    // Server
    if let Some(host) = env_string("HOST") {
        config.host = host;
    }
    if let Some(port) = env_parse::<u16>("PORT")? {
        config.port = port;
    }
    if env_bool("TLS_ENABLED")?.unwrap_or(false) {
        let cert_path = env_string("TLS_CERT_PATH")
            .ok_or("TLS_ENABLED is set but TLS_CERT_PATH is missing")?;
        let key_path = env_string("TLS_KEY_PATH")
            .ok_or("TLS_ENABLED is set but TLS_KEY_PATH is missing")?;
        config.tls = Some(TlsConfig {
            cert_path: PathBuf::from(cert_path),
            key_path: PathBuf::from(key_path),
        });
    }

    // LLM
    if let Some(base_url) = env_string("LLM_BASE_URL") {
        config.llm.base_url = base_url;
    }
    config.llm.api_key = env_string("LLM_API_KEY").or_else(|| env_string("TOGETHER_API_KEY"));
    if let Some(model) = env_string("DIALOGUE_MODEL") {
        config.llm.dialogue.model = model;
    }
    if let Some(model) = env_string("DIRECTOR_MODEL") {
        config.llm.director.model = model;
    }
    if let Some(model) = env_string("TOPICS_MODEL") {
        config.llm.topics.model = model;
    }

    // Voices
    config.voices.elevenlabs_api_key = env_string("ELEVENLABS_API_KEY");
    if let Some(url) = env_string("ELEVENLABS_BASE_URL") {
        config.voices.elevenlabs_base_url = url;
    }
    if let Some(model) = env_string("ELEVENLABS_MODEL") {
        config.voices.elevenlabs_model = model;
    }
    if let Some(format) = env_string("ELEVENLABS_OUTPUT_FORMAT") {
        config.voices.elevenlabs_output_format = format;
    }
    config.voices.neets_api_key = env_string("NEETS_API_KEY");
    if let Some(url) = env_string("NEETS_BASE_URL") {
        config.voices.neets_base_url = url;
    }
    if let Some(voice) = env_string("FAST_VOICE_ID") {
        config.voices.fast_voice_id = voice;
    }
    if let Some(model) = env_string("FAST_VOICE_MODEL") {
        config.voices.fast_model = model;
    }

    // Content
    if let Some(path) = env_string("PERSONAS_PATH") {
        config.content.personas_path = PathBuf::from(path);
    }
    if let Some(path) = env_string("TOPICS_PATH") {
        config.content.topics_path = PathBuf::from(path);
    }
    config.content.transcript_log_path = env_string("TRANSCRIPT_LOG_PATH").map(PathBuf::from);
    config.content.prompt_log_path = env_string("PROMPT_LOG_PATH").map(PathBuf::from);

    // Session
    let session = &mut config.session;
    if let Some(grace) = env_millis("GRACE_PERIOD_MS")? {
        session.grace_period = grace;
    }
    if let Some(delay) = env_millis("INTER_TURN_DELAY_MS")? {
        session.inter_turn_delay = delay;
    }
    if let Some(min) = env_parse("TOPIC_TURNS_MIN")? {
        session.topic_turns_min = min;
    }
    if let Some(max) = env_parse("TOPIC_TURNS_MAX")? {
        session.topic_turns_max = max;
    }
    if let Some(turns) = env_parse("CONTEXT_TURNS")? {
        session.context_turns = turns;
    }
    if let Some(seed) = env_string("SEED_LINE") {
        session.seed_line = seed;
    }
    if let Some(narrator) = env_string("NARRATOR") {
        session.narrator = narrator;
    }
    if let Some(emit) = env_bool("EMIT_DIAGNOSTICS")? {
        session.emit_diagnostics = emit;
    }

    // Security
    config.cors_allowed_origins = env_string("CORS_ALLOWED_ORIGINS");
    if let Some(rps) = env_parse("RATE_LIMIT_REQUESTS_PER_SECOND")? {
        config.rate_limit_requests_per_second = rps;
    }
    if let Some(burst) = env_parse("RATE_LIMIT_BURST_SIZE")? {
        config.rate_limit_burst_size = burst;
    }
    config.max_listener_connections = env_parse("MAX_LISTENER_CONNECTIONS")?;
    if let Some(per_ip) = env_parse("MAX_CONNECTIONS_PER_IP")? {
        config.max_connections_per_ip = per_ip;
    }

    Ok(config)
}
