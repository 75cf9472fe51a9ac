use std::path::PathBuf;
use std::time::Duration;

use super::yaml::{CompletionYaml, YamlConfig};
use super::{ServerConfig, TlsConfig, env};
use crate::core::llm::CompletionParams;

/// Environment-derived configuration with YAML values layered on top.
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = env::load_from_env()?;
    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(tls) = server.tls {
            match tls.enabled {
                Some(true) => {
                    let cert_path = tls
                        .cert_path
                        .ok_or("server.tls.enabled is true but cert_path is missing")?;
                    let key_path = tls
                        .key_path
                        .ok_or("server.tls.enabled is true but key_path is missing")?;
                    config.tls = Some(TlsConfig {
                        cert_path: PathBuf::from(cert_path),
                        key_path: PathBuf::from(key_path),
                    });
                }
                Some(false) => config.tls = None,
                None => {}
            }
        }
    }

    if let Some(llm) = yaml.llm {
        if let Some(base_url) = llm.base_url {
            config.llm.base_url = base_url;
        }
        if llm.api_key.is_some() {
            config.llm.api_key = llm.api_key;
        }
        apply_completion(&mut config.llm.dialogue, llm.dialogue);
        apply_completion(&mut config.llm.director, llm.director);
        apply_completion(&mut config.llm.topics, llm.topics);
    }

    if let Some(voices) = yaml.voices {
        let target = &mut config.voices;
        if voices.elevenlabs_api_key.is_some() {
            target.elevenlabs_api_key = voices.elevenlabs_api_key;
        }
        if let Some(url) = voices.elevenlabs_base_url {
            target.elevenlabs_base_url = url;
        }
        if let Some(model) = voices.elevenlabs_model {
            target.elevenlabs_model = model;
        }
        if let Some(format) = voices.elevenlabs_output_format {
            target.elevenlabs_output_format = format;
        }
        if voices.neets_api_key.is_some() {
            target.neets_api_key = voices.neets_api_key;
        }
        if let Some(url) = voices.neets_base_url {
            target.neets_base_url = url;
        }
        if let Some(voice) = voices.fast_voice_id {
            target.fast_voice_id = voice;
        }
        if let Some(model) = voices.fast_model {
            target.fast_model = model;
        }
    }

    if let Some(content) = yaml.content {
        if let Some(path) = content.personas_path {
            config.content.personas_path = PathBuf::from(path);
        }
        if let Some(path) = content.topics_path {
            config.content.topics_path = PathBuf::from(path);
        }
        if let Some(path) = content.transcript_log_path {
            config.content.transcript_log_path = Some(PathBuf::from(path));
        }
        if let Some(path) = content.prompt_log_path {
            config.content.prompt_log_path = Some(PathBuf::from(path));
        }
    }

    if let Some(session) = yaml.session {
        let target = &mut config.session;
        let millis = Duration::from_millis;

        if let Some(ms) = session.liveness_poll_ms {
            target.liveness_poll = millis(ms);
        }
        if let Some(ms) = session.selection_retry_delay_ms {
            target.selection_retry_delay = millis(ms);
        }
        if let Some(ms) = session.inter_turn_delay_ms {
            target.inter_turn_delay = millis(ms);
        }
        if let Some(ms) = session.grace_period_ms {
            target.grace_period = millis(ms);
        }
        if let Some(ms) = session.lookahead_interval_ms {
            target.lookahead_interval = millis(ms);
        }
        if let Some(ms) = session.fault_backoff_cap_ms {
            target.fault_backoff_cap = millis(ms);
        }
        if let Some(n) = session.lookahead_min_remaining {
            target.lookahead_min_remaining = n;
        }
        if let Some(n) = session.lookahead_sample_size {
            target.lookahead_sample_size = n;
        }
        if let Some(n) = session.topic_turns_min {
            target.topic_turns_min = n;
        }
        if let Some(n) = session.topic_turns_max {
            target.topic_turns_max = n;
        }
        if let Some(n) = session.max_fault_retries {
            target.max_fault_retries = n;
        }
        if let Some(n) = session.context_turns {
            target.context_turns = n;
        }
        if let Some(seed) = session.seed_line {
            target.seed_line = seed;
        }
        if let Some(narrator) = session.narrator {
            target.narrator = narrator;
        }
        if let Some(emit) = session.emit_diagnostics {
            target.emit_diagnostics = emit;
        }
        if let Some(retry) = session.retry {
            target.retry = retry;
        }
        if session.audio_retry.is_some() {
            target.audio_retry = session.audio_retry;
        }
    }

    if let Some(security) = yaml.security {
        if security.cors_allowed_origins.is_some() {
            config.cors_allowed_origins = security.cors_allowed_origins;
        }
        if let Some(rps) = security.rate_limit_requests_per_second {
            config.rate_limit_requests_per_second = rps;
        }
        if let Some(burst) = security.rate_limit_burst_size {
            config.rate_limit_burst_size = burst;
        }
        if security.max_listener_connections.is_some() {
            config.max_listener_connections = security.max_listener_connections;
        }
        if let Some(per_ip) = security.max_connections_per_ip {
            config.max_connections_per_ip = per_ip;
        }
    }

    Ok(config)
}

fn apply_completion(target: &mut CompletionParams, overrides: Option<CompletionYaml>) {
    let Some(overrides) = overrides else {
        return;
    };
    if let Some(model) = overrides.model {
        target.model = model;
    }
    if overrides.temperature.is_some() {
        target.temperature = overrides.temperature;
    }
    if overrides.max_tokens.is_some() {
        target.max_tokens = overrides.max_tokens;
    }
}
