use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::SessionController;
use crate::core::topic::{TopicGenerator, build_lookahead_prompt};

impl SessionController {
    /// Keep the topic list topped up while session `generation` runs.
    pub(super) async fn run_lookahead(
        self: Arc<Self>,
        generation: u64,
        generator: Arc<dyn TopicGenerator>,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(self.settings.lookahead_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if !self.is_current(generation) {
                        break;
                    }
                    self.ensure_lookahead(generator.as_ref()).await;
                }
            }
        }
        debug!("Topic lookahead stopped");
    }

    /// Generate and append one topic if too few are left ahead of the
    /// cursor. Returns the added topic. Generator failures are logged and
    /// swallowed.
    pub async fn ensure_lookahead(&self, generator: &dyn TopicGenerator) -> Option<String> {
        let prompt = {
            let state = self.state.lock();
            if !state.topics.needs_lookahead(self.settings.lookahead_min_remaining) {
                return None;
            }
            build_lookahead_prompt(
                self.registry.ids(),
                &state.topics.sample(self.settings.lookahead_sample_size),
            )
        };

        let topic = match generator.generate_topic(&prompt).await {
            Ok(topic) => topic,
            Err(e) => {
                warn!(error = %e, "Topic generation failed");
                return None;
            }
        };

        if self.state.lock().topics.append(&topic) {
            info!(topic = %topic, "Added topic");
            Some(topic)
        } else {
            debug!(topic = %topic, "Generated topic already queued");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::CompletionParams;
    use crate::core::session::tests::{Harness, harness};
    use crate::core::test_support::ScriptedCompletion;
    use crate::core::topic::LlmTopicGenerator;

    fn generator(llm: Arc<ScriptedCompletion>) -> LlmTopicGenerator {
        LlmTopicGenerator::new(llm, CompletionParams::topics())
    }

    #[tokio::test]
    async fn test_appends_when_running_low() {
        let Harness { controller, .. } = harness("Frank", "Hello there");
        let llm = Arc::new(ScriptedCompletion::always("\"Deep sea creatures\""));

        let added = controller.ensure_lookahead(&generator(llm.clone())).await;

        assert_eq!(added.as_deref(), Some("Deep sea creatures"));
        let topics = controller.topics().topics;
        assert_eq!(topics.last().map(String::as_str), Some("Deep sea creatures"));

        let prompt = &llm.requests()[0][0].content;
        assert!(prompt.contains("Joe Rogan, Frank"));
    }

    #[tokio::test]
    async fn test_duplicate_topic_not_appended() {
        let Harness { controller, .. } = harness("Frank", "Hello there");
        let before = controller.topics().topics.len();
        let llm = Arc::new(ScriptedCompletion::always("AI"));

        assert!(controller.ensure_lookahead(&generator(llm)).await.is_none());
        assert_eq!(controller.topics().topics.len(), before);
    }

    #[tokio::test]
    async fn test_generator_failure_is_swallowed() {
        let Harness { controller, .. } = harness("Frank", "Hello there");
        let before = controller.topics().topics.len();
        let llm = Arc::new(ScriptedCompletion::failing());

        assert!(controller.ensure_lookahead(&generator(llm)).await.is_none());
        assert_eq!(controller.topics().topics.len(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookahead_exits_for_stale_generation() {
        let Harness { controller, .. } = harness("Frank", "Hello there");
        let llm = Arc::new(ScriptedCompletion::always("Aliens"));

        // Token never cancelled: only the generation check can end the task
        let task = tokio::spawn(Arc::clone(&controller).run_lookahead(
            7,
            Arc::new(generator(llm.clone())),
            CancellationToken::new(),
        ));
        tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .expect("lookahead task should exit")
            .unwrap();
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_nothing_generated_with_enough_topics() {
        let Harness { controller, .. } = harness("Frank", "Hello there");
        for topic in ["Space", "Food", "Music", "Sports", "Movies"] {
            controller.set_topic(topic).unwrap();
        }
        let llm = Arc::new(ScriptedCompletion::always("Aliens"));

        assert!(controller.ensure_lookahead(&generator(llm.clone())).await.is_none());
        assert_eq!(llm.calls(), 0);
    }
}
