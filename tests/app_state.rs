//! Application state assembly from content files.

mod common;

use std::fs;

use tempfile::TempDir;

use botcast_gateway::{AppError, AppState, ServerConfig};
use common::ROSTER_YAML;

fn config_in(dir: &TempDir) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.content.personas_path = dir.path().join("personas.yaml");
    config.content.topics_path = dir.path().join("topics.yaml");
    config
}

#[tokio::test]
async fn test_state_loads_roster_and_topics() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("personas.yaml"), ROSTER_YAML).unwrap();
    fs::write(
        dir.path().join("topics.yaml"),
        "topics:\n  - Artificial intelligence\n  - Space travel\n",
    )
    .unwrap();

    let mut config = config_in(&dir);
    config.content.transcript_log_path = Some(dir.path().join("transcript.json"));

    let state = AppState::new(config).await.unwrap();

    let personas = state.session.personas();
    assert_eq!(personas.len(), 2);
    assert_eq!(personas[0].name, "Joe Rogan");

    let topics = state.session.topics();
    assert_eq!(topics.current_topic, "Artificial intelligence");
    assert_eq!(topics.topics.len(), 2);
    assert!(!state.session.is_active());
    assert_eq!(state.ws_connection_count(), 0);
}

#[tokio::test]
async fn test_missing_roster_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("topics.yaml"), "- Only topic\n").unwrap();

    let result = AppState::new(config_in(&dir)).await;
    assert!(matches!(result, Err(AppError::Persona(_))));
}

#[tokio::test]
async fn test_empty_topics_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("personas.yaml"), ROSTER_YAML).unwrap();
    fs::write(dir.path().join("topics.yaml"), "[]\n").unwrap();

    let result = AppState::new(config_in(&dir)).await;
    assert!(matches!(result, Err(AppError::Topic(_))));
}
