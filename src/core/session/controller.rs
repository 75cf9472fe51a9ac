use std::sync::{Arc, Weak};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{
    RunningTasks, SessionController, SessionError, SessionResult, SessionStatus, StartOutcome,
    StopOutcome,
};
use crate::core::broadcast::{ListenerEvent, StopReason};
use crate::core::persona::PersonaSummary;
use crate::core::topic::TopicsSnapshot;
use crate::core::transcript::Turn;

/// Longest topic accepted from the control surface, in characters.
pub const MAX_TOPIC_CHARS: usize = 500;

impl SessionController {
    /// Begin producing turns. Starting a running session changes nothing.
    pub fn start(self: &Arc<Self>) -> StartOutcome {
        // Tasks are registered before the state lock is released so a
        // concurrent `stop` always finds them. Lock order: state, then tasks.
        let generation = {
            let mut state = self.state.lock();
            if state.active {
                return StartOutcome::AlreadyRunning {
                    generation: state.generation,
                };
            }
            state.active = true;
            state.generation += 1;
            state.transcript.clear();
            let generation = state.generation;

            let cancel = CancellationToken::new();
            let previous = self.tasks.lock().replace(RunningTasks {
                generation,
                cancel: cancel.clone(),
            });
            if let Some(previous) = previous {
                previous.cancel.cancel();
            }

            tokio::spawn(Arc::clone(self).run_loop(generation, cancel.clone()));
            if let Some(ref generator) = self.topic_generator {
                tokio::spawn(Arc::clone(self).run_lookahead(
                    generation,
                    Arc::clone(generator),
                    cancel,
                ));
            }
            generation
        };

        info!(generation, "Session started");
        self.publisher.publish(ListenerEvent::ConversationStarted);
        StartOutcome::Started { generation }
    }

    /// Stop producing turns and reset the transcript and topic cursor.
    /// Stopping an idle session is a no-op.
    pub fn stop(&self, reason: StopReason) -> StopOutcome {
        let tasks = {
            let mut state = self.state.lock();
            if !state.active {
                return StopOutcome::NotRunning;
            }
            state.active = false;
            state.generation += 1;
            state.transcript.clear();
            state.topics.reset();
            self.tasks.lock().take()
        };

        if let Some(tasks) = tasks {
            tasks.cancel.cancel();
            info!(generation = tasks.generation, ?reason, "Session stopped");
        }

        self.publisher
            .publish(ListenerEvent::ConversationStopped { reason });
        StopOutcome::Stopped
    }

    /// Queue `topic` right after the current one.
    pub fn set_topic(&self, topic: &str) -> SessionResult<TopicsSnapshot> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(SessionError::EmptyTopic);
        }
        let len = topic.chars().count();
        if len > MAX_TOPIC_CHARS {
            return Err(SessionError::TopicTooLong {
                len,
                max: MAX_TOPIC_CHARS,
            });
        }

        let mut state = self.state.lock();
        if state.topics.insert(topic) {
            info!(topic, cursor = state.topics.cursor(), "Topic queued");
        }
        Ok(state.topics.snapshot())
    }

    pub fn topics(&self) -> TopicsSnapshot {
        self.state.lock().topics.snapshot()
    }

    pub fn personas(&self) -> Vec<PersonaSummary> {
        self.registry.summaries()
    }

    pub fn on_connect(&self, connection_id: &str) {
        self.tracker.on_connect(connection_id);
    }

    /// Forget a listener. If the audience is now empty and a session is
    /// running, arm the grace timer.
    pub fn on_disconnect(self: &Arc<Self>, connection_id: &str) {
        let Some(ticket) = self.tracker.on_disconnect(connection_id) else {
            return;
        };
        if !self.is_active() {
            return;
        }

        let controller: Weak<Self> = Arc::downgrade(self);
        self.tracker.watch_grace(ticket, move || {
            if let Some(controller) = controller.upgrade() {
                warn!("All listeners gone, stopping session");
                controller.stop(StopReason::ListenersGone);
            }
        });
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    pub fn listener_count(&self) -> usize {
        self.tracker.len()
    }

    pub fn transcript(&self) -> Vec<Turn> {
        self.state.lock().transcript.turns().to_vec()
    }

    pub fn status(&self) -> SessionStatus {
        let listeners = self.tracker.len();
        let state = self.state.lock();
        SessionStatus {
            active: state.active,
            generation: state.generation,
            listeners,
            transcript_len: state.transcript.len(),
            current_topic: state.topics.current().to_string(),
            remaining_turns: state.topics.remaining_turns(),
        }
    }
}
