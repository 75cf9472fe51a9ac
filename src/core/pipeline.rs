//! Two-stage turn generation: dialogue line, then audio.
//!
//! Each stage runs under its own [`RetryPolicy`]. If either stage runs out of
//! attempts the turn is abandoned; nothing about the session changes.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::journal::PromptLog;
use crate::core::llm::{ChatMessage, CompletionParams, LlmError, TextCompletion};
use crate::core::persona::{PersonaProfile, PersonaRegistry};
use crate::core::retry::RetryPolicy;
use crate::core::transcript::Turn;
use crate::core::tts::{SpeechSynthesis, TTSError};

/// Speaker id whose lines are replayed to the model with the `system` role.
pub const DEFAULT_NARRATOR: &str = "System";

/// Shortest acceptable cleaned line, in characters.
const MIN_LINE_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Text,
    Audio,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Text => write!(f, "text"),
            PipelineStage::Audio => write!(f, "audio"),
        }
    }
}

/// Failure of a single text-stage attempt.
#[derive(Debug, Error)]
pub enum LineError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Completion too short after cleanup: {0:?}")]
    Degenerate(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Text stage failed after {attempts} attempts: {source}")]
    TextExhausted {
        attempts: u32,
        #[source]
        source: LineError,
    },

    #[error("Audio stage failed after {attempts} attempts: {source}")]
    AudioExhausted {
        attempts: u32,
        #[source]
        source: TTSError,
    },
}

impl PipelineError {
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::TextExhausted { .. } => PipelineStage::Text,
            PipelineError::AudioExhausted { .. } => PipelineStage::Audio,
        }
    }
}

/// A fully generated turn, ready to publish.
#[derive(Debug, Clone)]
pub struct ProducedTurn {
    pub persona: Arc<PersonaProfile>,
    pub text: String,
    pub audio: Bytes,
}

/// Remove speaker-name echoes and quote characters from a raw completion.
pub fn clean_line(raw: &str, persona: &PersonaProfile) -> Result<String, LineError> {
    let cleaned = raw
        .trim()
        .replace(&format!("{}: ", persona.display_name), "")
        .replace(&format!("{}: ", persona.id), "")
        .replace('"', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() < MIN_LINE_CHARS {
        return Err(LineError::Degenerate(cleaned.to_string()));
    }
    Ok(cleaned.to_string())
}

fn line_system_prompt(persona: &PersonaProfile, others: &[String], topic: &str) -> String {
    let name = &persona.display_name;
    format!(
        "You are {name}. {name}'s description: {description}\n\n\
You are in a podcast with the following other guests: {others}.\n\
Your message should tie in with the most recent messages sent, but can also contain hilarious unpredictability.\n\
The current topic of discussion is: {topic}.\n\n\
Rules:\n\
1) Only respond as {name}.\n\
2) Frame your phrasing and messages as close to a podcast as possible.\n\
3) If the last message is from you, ensure your next response moves the conversation forward in an engaging manner.\n\
4) Do NOT add non conversational messages like *laughs*, *nods* or (chuckles). Do not include them at all.\n\
5) Make sure to talk about the current topic and naturally incorporate it into your response.\n\
6) Keep your responses funny and edgy, never too serious.\n\
7) Your response should be concise and limited to 50 words.\n\
8) Do NOT always mention the other guests' names in your response, especially in further turns.",
        description = persona.description,
        others = others.join(", "),
    )
}

/// Dialogue prompt for `persona`: a system message followed by one message
/// per prior turn, with the role chosen by who spoke it.
pub fn build_line_messages(
    persona: &PersonaProfile,
    registry: &PersonaRegistry,
    turns: &[Turn],
    topic: &str,
    narrator: &str,
) -> Vec<ChatMessage> {
    let others: Vec<String> = registry
        .iter()
        .filter(|p| p.id != persona.id)
        .map(|p| p.display_name.clone())
        .collect();

    let mut messages = Vec::with_capacity(turns.len() + 1);
    messages.push(ChatMessage::system(line_system_prompt(persona, &others, topic)));
    for turn in turns {
        let message = if turn.persona_id == narrator {
            ChatMessage::system(turn.text.clone())
        } else if turn.persona_id == persona.id {
            ChatMessage::assistant(turn.text.clone())
        } else {
            ChatMessage::user(turn.text.clone())
        };
        messages.push(message);
    }
    messages
}

pub struct GenerationPipeline {
    llm: Arc<dyn TextCompletion>,
    tts: Arc<dyn SpeechSynthesis>,
    registry: Arc<PersonaRegistry>,
    params: CompletionParams,
    text_retry: RetryPolicy,
    audio_retry: RetryPolicy,
    narrator: String,
    prompt_log: Option<PromptLog>,
}

impl GenerationPipeline {
    pub fn new(
        llm: Arc<dyn TextCompletion>,
        tts: Arc<dyn SpeechSynthesis>,
        registry: Arc<PersonaRegistry>,
        params: CompletionParams,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            llm,
            tts,
            registry,
            params,
            text_retry: retry.clone(),
            audio_retry: retry,
            narrator: DEFAULT_NARRATOR.to_string(),
            prompt_log: None,
        }
    }

    pub fn with_narrator(mut self, narrator: impl Into<String>) -> Self {
        self.narrator = narrator.into();
        self
    }

    pub fn with_prompt_log(mut self, prompt_log: PromptLog) -> Self {
        self.prompt_log = Some(prompt_log);
        self
    }

    pub fn with_audio_retry(mut self, retry: RetryPolicy) -> Self {
        self.audio_retry = retry;
        self
    }

    /// Text stage.
    pub async fn generate_line(
        &self,
        persona: &PersonaProfile,
        turns: &[Turn],
        topic: &str,
    ) -> Result<String, PipelineError> {
        let messages = build_line_messages(persona, &self.registry, turns, topic, &self.narrator);
        if let Some(ref log) = self.prompt_log {
            log.record(&messages).await;
        }

        let messages = &messages;
        let llm = &self.llm;
        let params = &self.params;
        self.text_retry
            .run("text", |attempt| async move {
                debug!(persona = %persona.id, attempt, "Generating line");
                let raw = llm.complete(messages, params).await?;
                clean_line(&raw, persona)
            })
            .await
            .map_err(|e| PipelineError::TextExhausted {
                attempts: e.attempts,
                source: e.last_error,
            })
    }

    /// Audio stage.
    pub async fn synthesize(
        &self,
        persona: &PersonaProfile,
        text: &str,
    ) -> Result<Bytes, PipelineError> {
        let tts = &self.tts;
        self.audio_retry
            .run("audio", |attempt| async move {
                debug!(persona = %persona.id, backend = persona.voice.backend.name(), attempt, "Synthesizing line");
                tts.synthesize(text, &persona.voice).await
            })
            .await
            .map_err(|e| PipelineError::AudioExhausted {
                attempts: e.attempts,
                source: e.last_error,
            })
    }

    /// Run both stages for `persona`.
    pub async fn produce_turn(
        &self,
        persona: Arc<PersonaProfile>,
        turns: &[Turn],
        topic: &str,
    ) -> Result<ProducedTurn, PipelineError> {
        let text = self.generate_line(&persona, turns, topic).await?;
        info!(persona = %persona.id, preview = %preview(&text), "Generated line");

        let audio = self.synthesize(&persona, &text).await?;
        info!(persona = %persona.id, bytes = audio.len(), "Synthesized audio");

        Ok(ProducedTurn {
            persona,
            text,
            audio,
        })
    }
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::ChatRole;
    use crate::core::persona::tests::profile;
    use crate::core::test_support::{ScriptedCompletion, ScriptedSpeech};
    use std::time::Duration;

    fn registry() -> Arc<PersonaRegistry> {
        Arc::new(
            PersonaRegistry::new(vec![profile("Joe Rogan", "joe-rogan"), profile("Frank", "abc")])
                .unwrap(),
        )
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..Default::default()
        }
    }

    fn pipeline(llm: Arc<ScriptedCompletion>, tts: Arc<ScriptedSpeech>) -> GenerationPipeline {
        GenerationPipeline::new(
            llm,
            tts,
            registry(),
            CompletionParams::dialogue(),
            fast_retry(),
        )
    }

    #[test]
    fn test_clean_line() {
        let frank = profile("Frank", "abc");
        assert_eq!(clean_line("Frank: \"Hello there\"", &frank).unwrap(), "Hello there");
        assert_eq!(clean_line("  ok  ", &frank).unwrap(), "ok");
        assert!(matches!(clean_line("\"\"", &frank), Err(LineError::Degenerate(_))));
        assert!(matches!(clean_line("x", &frank), Err(LineError::Degenerate(_))));
    }

    #[test]
    fn test_message_roles() {
        let registry = registry();
        let frank = registry.get("Frank").unwrap();
        let turns = vec![
            Turn::new("System", "Welcome back"),
            Turn::new("Joe Rogan", "Pull that up"),
            Turn::new("Frank", "Sure"),
        ];

        let messages = build_line_messages(frank, &registry, &turns, "AI", DEFAULT_NARRATOR);
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::System, ChatRole::System, ChatRole::User, ChatRole::Assistant]
        );
        assert!(messages[0].content.starts_with("You are Frank."));
        assert!(messages[0].content.contains("other guests: Joe Rogan."));
        assert!(messages[0].content.contains("topic of discussion is: AI."));
        assert_eq!(messages[2].content, "Pull that up");
    }

    #[tokio::test]
    async fn test_produce_turn() {
        let llm = Arc::new(ScriptedCompletion::always("Frank: Hello there"));
        let tts = Arc::new(ScriptedSpeech::always(vec![9, 9]));
        let pipeline = pipeline(llm.clone(), tts.clone());
        let frank = registry().get("Frank").cloned().unwrap();

        let turn = pipeline.produce_turn(frank, &[], "AI").await.unwrap();
        assert_eq!(turn.text, "Hello there");
        assert_eq!(turn.audio.as_ref(), &[9, 9]);
        assert_eq!(tts.texts(), vec!["Hello there"]);
    }

    #[tokio::test]
    async fn test_degenerate_text_exhausts_and_skips_audio() {
        let llm = Arc::new(ScriptedCompletion::always(""));
        let tts = Arc::new(ScriptedSpeech::always(vec![1]));
        let pipeline = pipeline(llm.clone(), tts.clone());
        let frank = registry().get("Frank").cloned().unwrap();

        let err = pipeline.produce_turn(frank, &[], "AI").await.unwrap_err();
        assert_eq!(err.stage(), PipelineStage::Text);
        assert!(matches!(
            err,
            PipelineError::TextExhausted {
                attempts: 3,
                source: LineError::Degenerate(_)
            }
        ));
        assert_eq!(llm.calls(), 3);
        assert_eq!(tts.calls(), 0);
    }

    #[tokio::test]
    async fn test_audio_retries_then_succeeds() {
        let llm = Arc::new(ScriptedCompletion::always("Good point"));
        let tts = Arc::new(ScriptedSpeech::new(vec![
            Err(TTSError::EmptyAudio),
            Ok(Bytes::from_static(b"ok")),
        ]));
        let pipeline = pipeline(llm.clone(), tts.clone());
        let frank = registry().get("Frank").cloned().unwrap();

        let turn = pipeline.produce_turn(frank, &[], "AI").await.unwrap();
        assert_eq!(turn.audio.as_ref(), b"ok");
        assert_eq!(tts.calls(), 2);
        // Text is not regenerated when audio fails
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_audio_exhaustion() {
        let llm = Arc::new(ScriptedCompletion::always("Good point"));
        let tts = Arc::new(ScriptedSpeech::failing());
        let pipeline = pipeline(llm, tts.clone());
        let frank = registry().get("Frank").cloned().unwrap();

        let err = pipeline.produce_turn(frank, &[], "AI").await.unwrap_err();
        assert_eq!(err.stage(), PipelineStage::Audio);
        assert_eq!(tts.calls(), 3);
    }

    #[tokio::test]
    async fn test_audio_retry_overrides_text_retry() {
        let llm = Arc::new(ScriptedCompletion::new(vec![
            Ok(String::new()),
            Ok("Second try".to_string()),
        ]));
        let tts = Arc::new(ScriptedSpeech::failing());
        let single_attempt = RetryPolicy {
            max_attempts: 1,
            ..fast_retry()
        };
        let pipeline = pipeline(llm.clone(), tts.clone()).with_audio_retry(single_attempt);
        let frank = registry().get("Frank").cloned().unwrap();

        let err = pipeline.produce_turn(frank, &[], "AI").await.unwrap_err();
        assert!(matches!(err, PipelineError::AudioExhausted { attempts: 1, .. }));
        assert_eq!(tts.calls(), 1);
        // The text stage still retries under its own policy
        assert_eq!(llm.calls(), 2);
    }
}
