//! Session control and the turn orchestration loop.
//!
//! [`SessionController`] is the single owner of [`SessionState`]. Every
//! mutation goes through its lock, and the lock is never held across an
//! `.await`. While a session runs, two tasks are attached to it: the
//! orchestration loop, which is the only producer of turns, and the topic
//! lookahead. Both are cancelled when the session stops.

mod controller;
mod lookahead;
mod orchestrator;
mod settings;
mod state;

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use orchestrator::{LoopFault, Step};
pub use settings::SessionSettings;

use crate::core::broadcast::TurnPublisher;
use crate::core::connections::ConnectionTracker;
use crate::core::journal::TranscriptJournal;
use crate::core::persona::PersonaRegistry;
use crate::core::pipeline::GenerationPipeline;
use crate::core::selector::SpeakerSelector;
use crate::core::topic::{TopicGenerator, TopicSequencer};
use state::SessionState;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Topic must not be empty")]
    EmptyTopic,

    #[error("Topic is too long ({len} > {max} characters)")]
    TopicTooLong { len: usize, max: usize },
}

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StartOutcome {
    Started { generation: u64 },
    AlreadyRunning { generation: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StopOutcome {
    Stopped,
    /// Nothing was running; the call had no effect.
    NotRunning,
}

/// Snapshot served by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub active: bool,
    pub generation: u64,
    pub listeners: usize,
    pub transcript_len: usize,
    pub current_topic: String,
    pub remaining_turns: u32,
}

/// Collaborators a controller is assembled from.
pub struct SessionDeps {
    pub registry: Arc<PersonaRegistry>,
    pub topics: TopicSequencer,
    pub selector: SpeakerSelector,
    pub pipeline: GenerationPipeline,
    pub topic_generator: Option<Arc<dyn TopicGenerator>>,
    pub publisher: Arc<dyn TurnPublisher>,
    pub journal: Option<Arc<dyn TranscriptJournal>>,
    pub settings: SessionSettings,
}

struct RunningTasks {
    generation: u64,
    cancel: CancellationToken,
}

pub struct SessionController {
    state: Mutex<SessionState>,
    tasks: Mutex<Option<RunningTasks>>,
    registry: Arc<PersonaRegistry>,
    tracker: Arc<ConnectionTracker>,
    selector: SpeakerSelector,
    pipeline: GenerationPipeline,
    topic_generator: Option<Arc<dyn TopicGenerator>>,
    publisher: Arc<dyn TurnPublisher>,
    journal: Option<Arc<dyn TranscriptJournal>>,
    settings: SessionSettings,
}

impl SessionController {
    pub fn new(deps: SessionDeps) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SessionState::new(deps.topics)),
            tasks: Mutex::new(None),
            tracker: Arc::new(ConnectionTracker::new(deps.settings.grace_period)),
            registry: deps.registry,
            selector: deps.selector,
            pipeline: deps.pipeline,
            topic_generator: deps.topic_generator,
            publisher: deps.publisher,
            journal: deps.journal,
            settings: deps.settings,
        })
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<PersonaRegistry> {
        &self.registry
    }

    pub fn tracker(&self) -> &Arc<ConnectionTracker> {
        &self.tracker
    }
}
