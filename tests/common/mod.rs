//! Shared helpers for integration tests: canned providers and a ready-made
//! application state that never touches the network.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use botcast_gateway::{
    AppState, BroadcastHub, ChatMessage, CompletionParams, GenerationPipeline, LlmError,
    LlmResult, PersonaRegistry, RetryPolicy, ServerConfig, SessionController, SessionDeps,
    SessionSettings, SpeakerSelector, SpeechSynthesis, TTSResult, TextCompletion,
    TopicSequencer, VoiceConfig, core::persona::VoiceDefaults,
};

pub const ROSTER_YAML: &str = r#"
personas:
  - id: Joe Rogan
    description: Curious host who loves a tangent.
    avatar_url: https://example.com/joe.png
    voice_id: joe-rogan
  - id: Frank
    display_name: Frank Degods
    description: Relentlessly online crypto founder.
    avatar_url: https://example.com/frank.png
    voice_id: abc
    mouth_positions:
      closed: https://example.com/frank-closed.png
      open: https://example.com/frank-open.png
"#;

/// Completion provider that always gives the same answer, or always fails.
pub struct FixedCompletion {
    answer: Option<String>,
    calls: AtomicUsize,
}

impl FixedCompletion {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextCompletion for FixedCompletion {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _params: &CompletionParams,
    ) -> LlmResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .clone()
            .ok_or_else(|| LlmError::RequestFailed("provider down".to_string()))
    }
}

/// Speech provider returning a fixed clip.
pub struct FixedSpeech {
    audio: Bytes,
}

impl FixedSpeech {
    pub fn new(audio: &'static [u8]) -> Self {
        Self {
            audio: Bytes::from_static(audio),
        }
    }
}

#[async_trait]
impl SpeechSynthesis for FixedSpeech {
    async fn synthesize(&self, _text: &str, _voice: &VoiceConfig) -> TTSResult<Bytes> {
        Ok(self.audio.clone())
    }

    fn provider_name(&self) -> &'static str {
        "fixed"
    }
}

/// Settings tuned so a session produces turns quickly in real time.
pub fn fast_settings() -> SessionSettings {
    let mut settings = SessionSettings::default();
    settings.liveness_poll = Duration::from_millis(20);
    settings.selection_retry_delay = Duration::from_millis(20);
    settings.inter_turn_delay = Duration::from_millis(50);
    settings.grace_period = Duration::from_millis(200);
    settings.retry = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(10),
        backoff_factor: 2.0,
    };
    settings
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub hub: BroadcastHub,
}

/// Application state backed by canned providers.
pub fn test_app(speaker: &str, line: &str, settings: SessionSettings) -> TestApp {
    test_app_with(
        Arc::new(FixedCompletion::answering(speaker)),
        Arc::new(FixedCompletion::answering(line)),
        settings,
    )
}

pub fn test_app_with(
    director: Arc<dyn TextCompletion>,
    dialogue: Arc<dyn TextCompletion>,
    settings: SessionSettings,
) -> TestApp {
    let registry = Arc::new(
        PersonaRegistry::from_yaml_str(ROSTER_YAML, &VoiceDefaults::default())
            .expect("roster parses"),
    );
    let topics = TopicSequencer::new(
        vec!["AI".to_string(), "Crypto".to_string()],
        settings.topic_turns_min..=settings.topic_turns_max,
    )
    .expect("topics are valid");
    let tts: Arc<dyn SpeechSynthesis> = Arc::new(FixedSpeech::new(b"ID3audio"));
    let hub = BroadcastHub::default();

    let session = SessionController::new(SessionDeps {
        selector: SpeakerSelector::new(director, CompletionParams::director()),
        pipeline: GenerationPipeline::new(
            dialogue,
            tts,
            Arc::clone(&registry),
            CompletionParams::dialogue(),
            settings.retry.clone(),
        ),
        registry,
        topics,
        topic_generator: None,
        publisher: Arc::new(hub.clone()),
        journal: None,
        settings,
    });

    let mut config = ServerConfig::default();
    config.host = "127.0.0.1".to_string();
    config.max_listener_connections = Some(4);
    config.max_connections_per_ip = 2;

    TestApp {
        state: AppState::from_parts(config, session, hub.clone()),
        hub,
    }
}
