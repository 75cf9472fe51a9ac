use std::time::Duration;

use crate::core::connections::DEFAULT_GRACE_PERIOD;
use crate::core::pipeline::DEFAULT_NARRATOR;
use crate::core::retry::RetryPolicy;
use crate::core::transcript::DEFAULT_SEED_LINE;

/// Timing and sizing knobs for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Wait between liveness checks while nobody is listening.
    pub liveness_poll: Duration,
    /// Wait after the director could not name a speaker.
    pub selection_retry_delay: Duration,
    /// Pause after every published turn.
    pub inter_turn_delay: Duration,
    /// How long an empty audience is tolerated before the session stops.
    pub grace_period: Duration,
    pub lookahead_interval: Duration,
    /// Generate a new topic when fewer than this many remain from the cursor.
    pub lookahead_min_remaining: usize,
    /// Existing topics shown to the topic model.
    pub lookahead_sample_size: usize,
    pub topic_turns_min: u32,
    pub topic_turns_max: u32,
    /// Cap of the exponential backoff after a loop fault.
    pub fault_backoff_cap: Duration,
    /// Consecutive faults after which the backoff exponent starts over.
    pub max_fault_retries: u32,
    /// Turns of transcript passed to the models. `0` means all.
    pub context_turns: usize,
    pub seed_line: String,
    pub narrator: String,
    /// Broadcast a `diagnostic` event when a turn is dropped.
    pub emit_diagnostics: bool,
    pub retry: RetryPolicy,
    /// Separate policy for the audio stage. `retry` applies when unset.
    pub audio_retry: Option<RetryPolicy>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            liveness_poll: Duration::from_secs(3),
            selection_retry_delay: Duration::from_millis(500),
            inter_turn_delay: Duration::from_secs(1),
            grace_period: DEFAULT_GRACE_PERIOD,
            lookahead_interval: Duration::from_secs(5),
            lookahead_min_remaining: 5,
            lookahead_sample_size: 5,
            topic_turns_min: 5,
            topic_turns_max: 10,
            fault_backoff_cap: Duration::from_secs(30),
            max_fault_retries: 3,
            context_turns: 0,
            seed_line: DEFAULT_SEED_LINE.to_string(),
            narrator: DEFAULT_NARRATOR.to_string(),
            emit_diagnostics: false,
            retry: RetryPolicy::default(),
            audio_retry: None,
        }
    }
}

impl SessionSettings {
    /// Backoff after the `faults`-th consecutive loop fault (0-based).
    pub fn fault_backoff(&self, faults: u32) -> Duration {
        let secs = 2u64.saturating_pow(faults);
        Duration::from_secs(secs).min(self.fault_backoff_cap)
    }
}
