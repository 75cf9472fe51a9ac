//! In-memory transcript of the current topic segment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seed line used as context when the transcript is empty.
pub const DEFAULT_SEED_LINE: &str = "Welcome to the Joe Rogan Experience, good to have you here.";

/// One spoken line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub persona_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(persona_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            persona_id: persona_id.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// `"persona: text"`, the form used in model context.
    pub fn context_line(&self) -> String {
        format!("{}: {}", self.persona_id, self.text)
    }
}

/// Ordered turns since the last topic change or session start.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The last `limit` turns, oldest first. `0` means everything.
    pub fn tail(&self, limit: usize) -> &[Turn] {
        if limit == 0 || limit >= self.turns.len() {
            &self.turns
        } else {
            &self.turns[self.turns.len() - limit..]
        }
    }
}

/// Context lines for `turns`, or just the seed line when there are none.
pub fn context_lines(turns: &[Turn], seed_line: &str) -> Vec<String> {
    if turns.is_empty() {
        vec![seed_line.to_string()]
    } else {
        turns.iter().map(Turn::context_line).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(n: usize) -> Transcript {
        let mut t = Transcript::new();
        for i in 0..n {
            t.push(Turn::new(format!("P{i}"), format!("line {i}")));
        }
        t
    }

    #[test]
    fn test_push_preserves_order() {
        let t = transcript(3);
        let ids: Vec<_> = t.turns().iter().map(|t| t.persona_id.as_str()).collect();
        assert_eq!(ids, vec!["P0", "P1", "P2"]);
        assert_eq!(t.turns()[2].text, "line 2");
    }

    #[test]
    fn test_tail() {
        let t = transcript(5);
        assert_eq!(t.tail(2).len(), 2);
        assert_eq!(t.tail(2)[0].persona_id, "P3");
        assert_eq!(t.tail(0).len(), 5);
        assert_eq!(t.tail(50).len(), 5);
    }

    #[test]
    fn test_clear() {
        let mut t = transcript(2);
        t.clear();
        assert!(t.is_empty());
        assert!(t.turns().is_empty());
    }

    #[test]
    fn test_context_lines_seed_when_empty() {
        assert_eq!(context_lines(&[], DEFAULT_SEED_LINE), vec![DEFAULT_SEED_LINE]);

        let t = transcript(2);
        assert_eq!(
            context_lines(t.turns(), DEFAULT_SEED_LINE),
            vec!["P0: line 0", "P1: line 1"]
        );
    }

    #[test]
    fn test_turn_serializes_timestamp() {
        let turn = Turn::new("A", "hello");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["persona_id"], "A");
        assert!(json["timestamp"].is_string());
    }
}
