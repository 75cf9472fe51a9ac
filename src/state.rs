//! Shared application state.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::core::broadcast::BroadcastHub;
use crate::core::journal::{JsonFileJournal, PromptLog, TranscriptJournal};
use crate::core::llm::{OpenAICompatibleClient, TextCompletion};
use crate::core::persona::PersonaRegistry;
use crate::core::pipeline::GenerationPipeline;
use crate::core::selector::SpeakerSelector;
use crate::core::session::{SessionController, SessionDeps};
use crate::core::topic::{LlmTopicGenerator, TopicGenerator, TopicSequencer, load_topics};
use crate::core::tts::{SpeechSynthesis, VoiceRouter};
use crate::errors::AppResult;

/// Why a listener connection was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionLimitError {
    GlobalLimitReached,
    PerIpLimitReached,
}

pub struct AppState {
    pub config: ServerConfig,
    pub session: Arc<SessionController>,
    pub hub: BroadcastHub,
    ws_connections: AtomicUsize,
    ip_connections: DashMap<IpAddr, usize>,
}

impl AppState {
    /// Load the roster and topics named in `config`, build the provider
    /// clients and assemble the session controller.
    pub async fn new(config: ServerConfig) -> AppResult<Arc<Self>> {
        let registry = Arc::new(PersonaRegistry::from_file(
            &config.content.personas_path,
            &config.voice_defaults(),
        )?);
        let settings = config.session.clone();
        let topics = TopicSequencer::new(
            load_topics(&config.content.topics_path)?,
            settings.topic_turns_min..=settings.topic_turns_max,
        )?;

        if config.llm.api_key.is_none() {
            warn!("No LLM API key configured; completions will be sent unauthenticated");
        }
        if config.voices.elevenlabs_api_key.is_none() || config.voices.neets_api_key.is_none() {
            warn!("A speech backend API key is missing; audio for some personas will fail");
        }

        let llm: Arc<dyn TextCompletion> = Arc::new(OpenAICompatibleClient::new(
            config.llm.base_url.clone(),
            config.llm.api_key.clone(),
        )?);
        let tts: Arc<dyn SpeechSynthesis> = Arc::new(VoiceRouter::from_configs(
            config.neets_config(),
            config.elevenlabs_config(),
        )?);

        let mut pipeline = GenerationPipeline::new(
            Arc::clone(&llm),
            tts,
            Arc::clone(&registry),
            config.llm.dialogue.clone(),
            settings.retry.clone(),
        )
        .with_narrator(settings.narrator.clone());
        if let Some(ref audio_retry) = settings.audio_retry {
            pipeline = pipeline.with_audio_retry(audio_retry.clone());
        }
        if let Some(ref path) = config.content.prompt_log_path {
            pipeline = pipeline.with_prompt_log(PromptLog::new(path));
        }

        let journal: Option<Arc<dyn TranscriptJournal>> = match config.content.transcript_log_path
        {
            Some(ref path) => {
                let journal = JsonFileJournal::new(path);
                let existing = journal.load().await.len();
                info!(path = %path.display(), existing, "Transcript journal enabled");
                Some(Arc::new(journal))
            }
            None => None,
        };

        let topic_generator: Arc<dyn TopicGenerator> = Arc::new(LlmTopicGenerator::new(
            Arc::clone(&llm),
            config.llm.topics.clone(),
        ));
        let hub = BroadcastHub::default();

        info!(
            personas = registry.len(),
            topics = topics.len(),
            "Show content loaded"
        );

        let session = SessionController::new(SessionDeps {
            selector: SpeakerSelector::new(llm, config.llm.director.clone()),
            pipeline,
            registry,
            topics,
            topic_generator: Some(topic_generator),
            publisher: Arc::new(hub.clone()),
            journal,
            settings,
        });

        Ok(Self::from_parts(config, session, hub))
    }

    /// Assemble state around an existing controller. `hub` must be the
    /// publisher the controller was built with.
    pub fn from_parts(
        config: ServerConfig,
        session: Arc<SessionController>,
        hub: BroadcastHub,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            session,
            hub,
            ws_connections: AtomicUsize::new(0),
            ip_connections: DashMap::new(),
        })
    }

    /// Reserve a listener slot for `ip`.
    pub fn try_acquire_connection(&self, ip: IpAddr) -> Result<(), ConnectionLimitError> {
        let per_ip_limit = self.config.max_connections_per_ip as usize;

        // Holding the entry serializes acquisitions for the same IP
        let mut per_ip = self.ip_connections.entry(ip).or_insert(0);
        if *per_ip >= per_ip_limit {
            return Err(ConnectionLimitError::PerIpLimitReached);
        }

        if let Some(max) = self.config.max_listener_connections {
            let acquired = self
                .ws_connections
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                    (current < max).then_some(current + 1)
                });
            if acquired.is_err() {
                let unused = *per_ip == 0;
                drop(per_ip);
                if unused {
                    self.ip_connections.remove_if(&ip, |_, count| *count == 0);
                }
                return Err(ConnectionLimitError::GlobalLimitReached);
            }
        } else {
            self.ws_connections.fetch_add(1, Ordering::SeqCst);
        }

        *per_ip += 1;
        Ok(())
    }

    /// Release a slot taken with [`Self::try_acquire_connection`].
    pub fn release_connection(&self, ip: IpAddr) {
        let _ = self
            .ws_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| c.checked_sub(1));
        self.ip_connections.remove_if_mut(&ip, |_, count| {
            *count = count.saturating_sub(1);
            *count == 0
        });
    }

    pub fn ws_connection_count(&self) -> usize {
        self.ws_connections.load(Ordering::SeqCst)
    }

    pub fn ip_connection_count(&self, ip: &IpAddr) -> usize {
        self.ip_connections.get(ip).map(|c| *c).unwrap_or(0)
    }
}
