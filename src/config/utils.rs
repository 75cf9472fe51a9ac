use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Read a variable, treating an empty value as unset.
pub(super) fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse a variable.
pub(super) fn env_parse<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: Display,
{
    match env_string(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {name} ({raw}): {e}").into()),
        None => Ok(None),
    }
}

/// Accepts `true`/`false`, `1`/`0`, `yes`/`no` (any case).
pub(super) fn env_bool(name: &str) -> Result<Option<bool>, Box<dyn std::error::Error>> {
    let Some(raw) = env_string(name) else {
        return Ok(None);
    };
    parse_bool(&raw)
        .map(Some)
        .ok_or_else(|| format!("Invalid value for {name} ({raw}): expected a boolean").into())
}

/// A millisecond count.
pub(super) fn env_millis(name: &str) -> Result<Option<Duration>, Box<dyn std::error::Error>> {
    Ok(env_parse::<u64>(name)?.map(Duration::from_millis))
}

pub(super) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
