use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::SessionController;
use crate::core::broadcast::{ListenerEvent, TurnPayload};
use crate::core::journal::JournalEntry;
use crate::core::pipeline::ProducedTurn;
use crate::core::topic::TickOutcome;
use crate::core::transcript::{Turn, context_lines};

/// What one loop iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nobody is listening; nothing was generated.
    NoListeners,
    /// The director could not name a speaker.
    NoSpeaker,
    /// A pipeline stage ran out of attempts; the turn was dropped.
    TurnFailed,
    /// A turn was published and recorded.
    Produced,
    /// The session ended while the turn was being generated.
    Discarded,
}

/// Unexpected failure inside an iteration.
#[derive(Debug, Error)]
pub enum LoopFault {
    #[error("Selected persona {0} is not in the roster")]
    UnknownPersona(String),

    #[error("Iteration panicked: {0}")]
    Panicked(String),
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl SessionController {
    /// Produce turns until the session identified by `generation` ends.
    pub(super) async fn run_loop(self: Arc<Self>, generation: u64, cancel: CancellationToken) {
        info!(generation, "Orchestration loop started");
        let mut faults: u32 = 0;

        loop {
            if cancel.is_cancelled() || !self.is_current(generation) {
                break;
            }

            let result = AssertUnwindSafe(self.run_iteration(generation))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(LoopFault::Panicked(panic_message(payload))));

            let delay = match result {
                Ok(step) => {
                    if step == Step::Produced {
                        faults = 0;
                    }
                    self.delay_after(step)
                }
                Err(fault) => {
                    let backoff = self.settings.fault_backoff(faults);
                    error!(generation, error = %fault, backoff_ms = backoff.as_millis() as u64, "Orchestration iteration failed");
                    faults += 1;
                    if faults > self.settings.max_fault_retries {
                        faults = 0;
                    }
                    backoff
                }
            };

            if delay.is_zero() {
                continue;
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!(generation, "Orchestration loop finished");
    }

    fn delay_after(&self, step: Step) -> Duration {
        match step {
            Step::NoListeners => self.settings.liveness_poll,
            Step::NoSpeaker => self.settings.selection_retry_delay,
            Step::TurnFailed | Step::Discarded => Duration::ZERO,
            Step::Produced => self.settings.inter_turn_delay,
        }
    }

    pub(super) fn is_current(&self, generation: u64) -> bool {
        self.state.lock().is_current(generation)
    }

    /// One pass: check the audience, pick a speaker, generate, commit.
    pub(super) async fn run_iteration(&self, generation: u64) -> Result<Step, LoopFault> {
        if self.tracker.is_empty() {
            debug!("No listeners, waiting");
            return Ok(Step::NoListeners);
        }

        let (turns, topic) = {
            let state = self.state.lock();
            if !state.is_current(generation) {
                return Ok(Step::Discarded);
            }
            (
                state.transcript.tail(self.settings.context_turns).to_vec(),
                state.topics.current().to_string(),
            )
        };

        let context = context_lines(&turns, &self.settings.seed_line);
        let Some(persona_id) = self
            .selector
            .select_next(&context, self.registry.ids())
            .await
        else {
            debug!("No speaker selected");
            return Ok(Step::NoSpeaker);
        };

        let persona = self
            .registry
            .get(&persona_id)
            .cloned()
            .ok_or(LoopFault::UnknownPersona(persona_id))?;
        info!(persona = %persona.id, topic = %topic, "Selected speaker");

        let produced = match self.pipeline.produce_turn(persona, &turns, &topic).await {
            Ok(produced) => produced,
            Err(e) => {
                warn!(stage = %e.stage(), error = %e, "Turn dropped");
                if self.settings.emit_diagnostics {
                    self.publisher.publish(ListenerEvent::Diagnostic {
                        stage: e.stage().to_string(),
                        message: e.to_string(),
                    });
                }
                return Ok(Step::TurnFailed);
            }
        };

        let Some(turn) = self.commit_turn(generation, &produced) else {
            info!(generation, "Session ended during generation, discarding turn");
            return Ok(Step::Discarded);
        };

        if let Some(ref journal) = self.journal {
            if let Err(e) = journal.append(JournalEntry::from(&turn)).await {
                warn!(error = %e, "Failed to append to journal");
            }
        }
        Ok(Step::Produced)
    }

    /// Publish, append and tick as one step, if the session is still the
    /// one that produced the turn.
    fn commit_turn(&self, generation: u64, produced: &ProducedTurn) -> Option<Turn> {
        let payload = TurnPayload::from(produced);
        let turn = Turn::new(produced.persona.id.clone(), produced.text.clone());

        let mut state = self.state.lock();
        if !state.is_current(generation) {
            return None;
        }

        self.publisher.publish(ListenerEvent::AudioSegment(payload));
        state.transcript.push(turn.clone());
        match state.topics.tick() {
            TickOutcome::Advanced { topic, cursor } => {
                state.transcript.clear();
                info!(topic = %topic, cursor, "Switching to next topic");
            }
            TickOutcome::Continued { remaining } => {
                debug!(remaining, "Turns left on topic");
            }
        }
        Some(turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::broadcast::StopReason;
    use crate::core::session::tests::{Harness, harness, harness_with, test_settings};
    use crate::core::test_support::{ScriptedCompletion, ScriptedSpeech};

    #[tokio::test(start_paused = true)]
    async fn test_iteration_without_listeners() {
        let Harness {
            controller,
            selector_llm,
            ..
        } = harness("Frank", "Hello there");
        controller.start();

        assert_eq!(controller.run_iteration(1).await.unwrap(), Step::NoListeners);
        assert_eq!(selector_llm.calls(), 0);
        controller.stop(StopReason::Requested);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_turn_end_to_end() {
        let Harness {
            controller,
            hub,
            tts,
            ..
        } = harness("Frank", "Hello there");
        let mut events = hub.subscribe();
        controller.on_connect("listener");

        // Drive the iteration directly rather than through the spawned loop
        {
            let mut state = controller.state.lock();
            state.active = true;
            state.generation = 7;
        }
        let before = controller.status().remaining_turns;

        assert_eq!(controller.run_iteration(7).await.unwrap(), Step::Produced);

        let transcript = controller.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].persona_id, "Frank");
        assert_eq!(transcript[0].text, "Hello there");
        assert_eq!(controller.status().remaining_turns, before - 1);
        assert_eq!(tts.texts(), vec!["Hello there"]);

        let event = events.recv().await.unwrap();
        match event.as_ref() {
            ListenerEvent::AudioSegment(payload) => {
                assert_eq!(payload.metadata.text, "Hello there");
                assert_eq!(payload.metadata.character.id, "Frank");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_text_stage_leaves_state_untouched() {
        let harness = harness_with(
            ScriptedCompletion::always("Frank"),
            ScriptedCompletion::always(""),
            ScriptedSpeech::always(b"mp3".to_vec()),
            test_settings(),
        );
        let controller = harness.controller;
        let mut events = harness.hub.subscribe();
        controller.on_connect("listener");
        {
            let mut state = controller.state.lock();
            state.active = true;
            state.generation = 1;
        }
        let before = controller.status().remaining_turns;

        assert_eq!(controller.run_iteration(1).await.unwrap(), Step::TurnFailed);
        assert_eq!(harness.dialogue_llm.calls(), 3);
        assert_eq!(harness.tts.calls(), 0);
        assert!(controller.transcript().is_empty());
        assert_eq!(controller.status().remaining_turns, before);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_diagnostic_emitted_when_enabled() {
        let mut settings = test_settings();
        settings.emit_diagnostics = true;
        let harness = harness_with(
            ScriptedCompletion::always("Frank"),
            ScriptedCompletion::always("Fine line"),
            ScriptedSpeech::failing(),
            settings,
        );
        let mut events = harness.hub.subscribe();
        harness.controller.on_connect("listener");
        {
            let mut state = harness.controller.state.lock();
            state.active = true;
            state.generation = 1;
        }

        assert_eq!(harness.controller.run_iteration(1).await.unwrap(), Step::TurnFailed);
        match events.recv().await.unwrap().as_ref() {
            ListenerEvent::Diagnostic { stage, .. } => assert_eq!(stage, "audio"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_speaker_step() {
        let Harness { controller, .. } = harness("Nobody", "Hello there");
        controller.on_connect("listener");
        {
            let mut state = controller.state.lock();
            state.active = true;
            state.generation = 1;
        }
        assert_eq!(controller.run_iteration(1).await.unwrap(), Step::NoSpeaker);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_is_discarded() {
        let Harness { controller, hub, .. } = harness("Frank", "Hello there");
        let mut events = hub.subscribe();
        controller.on_connect("listener");
        {
            let mut state = controller.state.lock();
            state.active = true;
            state.generation = 2;
        }

        assert_eq!(controller.run_iteration(1).await.unwrap(), Step::Discarded);
        assert!(controller.transcript().is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_topic_advance_resets_transcript() {
        let mut settings = test_settings();
        settings.topic_turns_min = 2;
        settings.topic_turns_max = 2;
        let harness = harness_with(
            ScriptedCompletion::always("Frank"),
            ScriptedCompletion::always("Hello there"),
            ScriptedSpeech::always(b"mp3".to_vec()),
            settings,
        );
        let controller = harness.controller;
        controller.on_connect("listener");
        {
            let mut state = controller.state.lock();
            state.active = true;
            state.generation = 1;
        }

        controller.run_iteration(1).await.unwrap();
        assert_eq!(controller.transcript().len(), 1);
        assert_eq!(controller.topics().current_topic, "AI");

        controller.run_iteration(1).await.unwrap();
        assert!(controller.transcript().is_empty());
        assert_eq!(controller.topics().current_topic, "Crypto");
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_loop_produces_until_stopped() {
        let Harness { controller, hub, .. } = harness("Frank", "Hello there");
        let mut events = hub.subscribe();
        controller.on_connect("listener");
        controller.start();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        controller.stop(StopReason::Requested);

        let mut segments = 0;
        let mut stopped = false;
        while let Ok(event) = events.try_recv() {
            match event.as_ref() {
                ListenerEvent::AudioSegment(_) => {
                    assert!(!stopped, "segment published after stop");
                    segments += 1;
                }
                ListenerEvent::ConversationStopped { .. } => stopped = true,
                _ => {}
            }
        }
        assert!(segments >= 3);
        assert!(stopped);

        // Nothing is produced once the session is stopped
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(events.try_recv().is_err());
    }
}
