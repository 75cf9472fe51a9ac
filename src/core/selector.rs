//! Next-speaker selection.
//!
//! An explicit `"Replying to <id>"` marker in the latest line wins outright.
//! Otherwise a director model is asked to name one persona; anything that is
//! not an exact roster id counts as no answer.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::llm::{ChatMessage, CompletionParams, TextCompletion};

/// Look for a reply marker naming a roster member in the last context line.
///
/// Roster order decides between several matches.
pub fn find_reply_target(context: &[String], roster: &[String]) -> Option<String> {
    let latest = context.last()?;
    roster
        .iter()
        .find(|id| latest.contains(&format!("Replying to {id}")))
        .cloned()
}

/// Map the director's raw answer onto a roster id.
pub fn validate_choice(answer: &str, roster: &[String]) -> Option<String> {
    let answer = answer.trim();
    if answer.eq_ignore_ascii_case("none") {
        return None;
    }
    roster.iter().find(|id| id.as_str() == answer).cloned()
}

fn director_prompt(roster: &[String]) -> String {
    let list = roster.join(", ");
    format!(
        "You are a conversation director who decides which AI character from this character_list: \
[{list}] responds next in a conversation to keep it moving forward in an engaging manner.\n\
RULES:\n\
1) If the last message refers to a specific character, the next response should DEFINITELY be from that character.\n\
2) Even if the last message refers to someone not in the character_list: [{list}], still respond with someone in the list: [{list}].\n\
3) Consider the entire conversation to determine your choice.\n\
Only return 1 item from the list: [{list}] and nothing else."
    )
}

pub struct SpeakerSelector {
    llm: Arc<dyn TextCompletion>,
    params: CompletionParams,
}

impl SpeakerSelector {
    pub fn new(llm: Arc<dyn TextCompletion>, params: CompletionParams) -> Self {
        Self { llm, params }
    }

    /// Pick who speaks next. Returns `None` when no valid persona could be
    /// determined; the caller simply tries again later.
    pub async fn select_next(&self, context: &[String], roster: &[String]) -> Option<String> {
        if let Some(target) = find_reply_target(context, roster) {
            info!(persona = %target, "Reply marker selects next speaker");
            return Some(target);
        }

        let messages = [
            ChatMessage::system(director_prompt(roster)),
            ChatMessage::user(format!(
                "Based on this conversation:\n{}\n\nWho should speak next?",
                context.join("\n")
            )),
        ];

        match self.llm.complete(&messages, &self.params).await {
            Ok(answer) => {
                let choice = validate_choice(&answer, roster);
                if choice.is_none() {
                    debug!(answer = %answer, "Director answer is not a roster member");
                }
                choice
            }
            Err(e) => {
                warn!(error = %e, "Speaker selection failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::ChatRole;
    use crate::core::test_support::ScriptedCompletion;

    fn roster() -> Vec<String> {
        vec!["Joe Rogan".to_string(), "Frank Degods".to_string()]
    }

    fn ctx(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_find_reply_target() {
        let context = ctx(&["Joe Rogan: Replying to Frank Degods, that's wild"]);
        assert_eq!(
            find_reply_target(&context, &roster()),
            Some("Frank Degods".to_string())
        );
        assert_eq!(find_reply_target(&ctx(&["no marker"]), &roster()), None);
        assert_eq!(find_reply_target(&[], &roster()), None);
        // Only the most recent line counts
        let older = ctx(&["Replying to Frank Degods", "Joe Rogan: hi"]);
        assert_eq!(find_reply_target(&older, &roster()), None);
    }

    #[test]
    fn test_validate_choice() {
        assert_eq!(validate_choice(" Joe Rogan\n", &roster()), Some("Joe Rogan".into()));
        assert_eq!(validate_choice("NONE", &roster()), None);
        assert_eq!(validate_choice("joe rogan", &roster()), None);
        assert_eq!(validate_choice("Elon", &roster()), None);
    }

    #[tokio::test]
    async fn test_reply_marker_skips_model() {
        let llm = Arc::new(ScriptedCompletion::always("Joe Rogan"));
        let selector = SpeakerSelector::new(llm.clone(), CompletionParams::director());

        let choice = selector
            .select_next(&ctx(&["A: Replying to Frank Degods"]), &roster())
            .await;
        assert_eq!(choice.as_deref(), Some("Frank Degods"));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_model_choice_is_validated() {
        let llm = Arc::new(ScriptedCompletion::new(vec![
            Ok("Frank Degods".to_string()),
            Ok("Somebody Else".to_string()),
            Ok("none".to_string()),
        ]));
        let selector = SpeakerSelector::new(llm.clone(), CompletionParams::director());
        let context = ctx(&["Joe Rogan: hello"]);

        assert_eq!(
            selector.select_next(&context, &roster()).await.as_deref(),
            Some("Frank Degods")
        );
        assert_eq!(selector.select_next(&context, &roster()).await, None);
        assert_eq!(selector.select_next(&context, &roster()).await, None);
        assert_eq!(llm.calls(), 3);
    }

    #[tokio::test]
    async fn test_provider_failure_yields_none() {
        let llm = Arc::new(ScriptedCompletion::failing());
        let selector = SpeakerSelector::new(llm.clone(), CompletionParams::director());

        assert_eq!(selector.select_next(&ctx(&["x"]), &roster()).await, None);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_director_prompt_shape() {
        let llm = Arc::new(ScriptedCompletion::always("Joe Rogan"));
        let selector = SpeakerSelector::new(llm.clone(), CompletionParams::director());
        selector
            .select_next(&ctx(&["Joe Rogan: one", "Frank Degods: two"]), &roster())
            .await;

        let requests = llm.requests();
        let messages = &requests[0];
        assert_eq!(messages[0].role, ChatRole::System);
        assert!(messages[0].content.contains("[Joe Rogan, Frank Degods]"));
        assert_eq!(messages[1].role, ChatRole::User);
        assert!(messages[1].content.contains("Joe Rogan: one\nFrank Degods: two"));
    }
}
