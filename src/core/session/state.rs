use crate::core::topic::TopicSequencer;
use crate::core::transcript::Transcript;

/// Everything a session mutates. Lives behind the controller's lock.
#[derive(Debug)]
pub(crate) struct SessionState {
    pub(crate) active: bool,
    /// Incremented on every start and stop. Work started under an older
    /// generation must not touch the state.
    pub(crate) generation: u64,
    pub(crate) transcript: Transcript,
    pub(crate) topics: TopicSequencer,
}

impl SessionState {
    pub(crate) fn new(topics: TopicSequencer) -> Self {
        Self {
            active: false,
            generation: 0,
            transcript: Transcript::new(),
            topics,
        }
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.active && self.generation == generation
    }
}
