use super::{ServerConfig, TlsConfig};
use crate::core::retry::RetryPolicy;
use crate::core::session::SessionSettings;

/// Validate a merged configuration.
pub(super) fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(ref tls) = config.tls {
        validate_tls(tls)?;
    }
    validate_llm_base_url(&config.llm.base_url)?;
    validate_session(&config.session)?;
    validate_retry("session.retry", &config.session.retry)?;
    if let Some(ref audio_retry) = config.session.audio_retry {
        validate_retry("session.audio_retry", audio_retry)?;
    }
    validate_limits(config)?;
    Ok(())
}

fn validate_tls(tls: &TlsConfig) -> Result<(), Box<dyn std::error::Error>> {
    if !tls.cert_path.exists() {
        return Err(format!(
            "TLS certificate file not found: {}",
            tls.cert_path.display()
        )
        .into());
    }
    if !tls.key_path.exists() {
        return Err(format!("TLS key file not found: {}", tls.key_path.display()).into());
    }
    Ok(())
}

fn validate_llm_base_url(base_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(format!("llm.base_url must be an http(s) URL, got '{base_url}'").into());
    }
    Ok(())
}

pub(super) fn validate_session(
    session: &SessionSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    if session.topic_turns_min == 0 || session.topic_turns_min > session.topic_turns_max {
        return Err(format!(
            "session.topic_turns_min ({}) must be at least 1 and not exceed topic_turns_max ({})",
            session.topic_turns_min, session.topic_turns_max
        )
        .into());
    }
    if session.lookahead_interval.is_zero() {
        return Err("session.lookahead_interval_ms must be greater than zero".into());
    }
    if session.liveness_poll.is_zero() {
        return Err("session.liveness_poll_ms must be greater than zero".into());
    }
    if session.seed_line.trim().is_empty() {
        return Err("session.seed_line must not be empty".into());
    }
    if session.narrator.trim().is_empty() {
        return Err("session.narrator must not be empty".into());
    }
    Ok(())
}

fn validate_retry(name: &str, retry: &RetryPolicy) -> Result<(), Box<dyn std::error::Error>> {
    if retry.max_attempts == 0 {
        return Err(format!("{name}.max_attempts must be at least 1").into());
    }
    if !retry.backoff_factor.is_finite() || retry.backoff_factor < 1.0 {
        return Err(format!(
            "{name}.backoff_factor must be >= 1.0, got {}",
            retry.backoff_factor
        )
        .into());
    }
    Ok(())
}

fn validate_limits(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.max_connections_per_ip == 0 {
        return Err("security.max_connections_per_ip must be greater than zero".into());
    }
    if config.max_listener_connections == Some(0) {
        return Err("security.max_listener_connections must be greater than zero".into());
    }
    if config.rate_limit_requests_per_second == 0 || config.rate_limit_burst_size == 0 {
        return Err("rate limit settings must be greater than zero".into());
    }
    Ok(())
}
