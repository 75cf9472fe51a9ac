pub mod broadcast;
pub mod connections;
pub mod journal;
pub mod llm;
pub mod persona;
pub mod pipeline;
pub mod retry;
pub mod selector;
pub mod session;
pub mod topic;
pub mod transcript;
pub mod tts;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types for convenience
pub use broadcast::{BroadcastHub, ListenerEvent, StopReason, TurnPayload, TurnPublisher};
pub use connections::ConnectionTracker;
pub use journal::{JsonFileJournal, PromptLog, TranscriptJournal};
pub use llm::{
    ChatMessage, ChatRole, CompletionParams, LlmError, LlmResult, OpenAICompatibleClient,
    TextCompletion,
};
pub use persona::{PersonaError, PersonaProfile, PersonaRegistry, VoiceBackend, VoiceConfig};
pub use pipeline::{GenerationPipeline, PipelineError, ProducedTurn};
pub use retry::RetryPolicy;
pub use selector::SpeakerSelector;
pub use session::{
    SessionController, SessionDeps, SessionError, SessionSettings, SessionStatus, StartOutcome,
    StopOutcome,
};
pub use topic::{LlmTopicGenerator, TopicError, TopicGenerator, TopicSequencer};
pub use transcript::{Transcript, Turn};
pub use tts::{SpeechSynthesis, TTSError, TTSResult, VoiceRouter};
