//! Topic sequencing.
//!
//! The conversation is steered through an ordered, growable list of topics.
//! A cursor points at the current topic and a randomized countdown decides
//! how many turns are spent on it before moving on. The sequence never
//! shrinks and is never empty; past the end the cursor wraps to the head.

mod lookahead;

use std::ops::RangeInclusive;
use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use lookahead::{LlmTopicGenerator, TopicGenerator, build_lookahead_prompt, clean_topic};

#[derive(Debug, Error)]
pub enum TopicError {
    #[error("Topic list must contain at least one topic")]
    Empty,

    #[error("Invalid turn bounds: {min}..={max}")]
    InvalidBounds { min: u32, max: u32 },

    #[error("Failed to read topics file {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse topics: {0}")]
    Parse(String),
}

pub type TopicResult<T> = Result<T, TopicError>;

/// Result of a [`TopicSequencer::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still on the same topic; carries the turns left on it.
    Continued { remaining: u32 },
    /// The cursor moved. The transcript must be reset.
    Advanced { topic: String, cursor: usize },
}

/// Point-in-time view of the topic list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicsSnapshot {
    pub topics: Vec<String>,
    pub current_topic: String,
    pub cursor: usize,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TopicsFile {
    List(Vec<String>),
    Keyed { topics: Vec<String> },
}

/// Load a topic list from a YAML (or JSON) file, either a bare list or a
/// `topics:` key.
pub fn load_topics(path: &Path) -> TopicResult<Vec<String>> {
    let contents = std::fs::read_to_string(path).map_err(|e| TopicError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let parsed: TopicsFile =
        serde_yaml::from_str(&contents).map_err(|e| TopicError::Parse(e.to_string()))?;
    let topics = match parsed {
        TopicsFile::List(topics) | TopicsFile::Keyed { topics } => topics,
    };
    Ok(topics
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}

/// Ordered topic list with a cursor and a per-topic turn countdown.
#[derive(Debug, Clone)]
pub struct TopicSequencer {
    topics: Vec<String>,
    cursor: usize,
    remaining: u32,
    turn_bounds: RangeInclusive<u32>,
}

impl TopicSequencer {
    pub fn new(topics: Vec<String>, turn_bounds: RangeInclusive<u32>) -> TopicResult<Self> {
        if topics.is_empty() {
            return Err(TopicError::Empty);
        }
        let (min, max) = (*turn_bounds.start(), *turn_bounds.end());
        if min == 0 || min > max {
            return Err(TopicError::InvalidBounds { min, max });
        }

        let mut sequencer = Self {
            topics,
            cursor: 0,
            remaining: 0,
            turn_bounds,
        };
        sequencer.remaining = sequencer.draw_turns();
        Ok(sequencer)
    }

    fn draw_turns(&self) -> u32 {
        rand::thread_rng().gen_range(self.turn_bounds.clone())
    }

    pub fn current(&self) -> &str {
        &self.topics[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Turns left before the cursor advances.
    pub fn remaining_turns(&self) -> u32 {
        self.remaining
    }

    /// Topics from the cursor (inclusive) to the end of the list.
    pub fn topics_ahead(&self) -> usize {
        self.topics.len() - self.cursor
    }

    /// Count one completed turn against the current topic.
    pub fn tick(&mut self) -> TickOutcome {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return TickOutcome::Continued {
                remaining: self.remaining,
            };
        }

        self.remaining = self.draw_turns();
        self.cursor = (self.cursor + 1) % self.topics.len();
        TickOutcome::Advanced {
            topic: self.current().to_string(),
            cursor: self.cursor,
        }
    }

    /// Queue a topic right after the current one. No-op if it is already
    /// present. Returns whether the list changed.
    pub fn insert(&mut self, topic: &str) -> bool {
        if self.contains(topic) {
            return false;
        }
        self.topics.insert(self.cursor + 1, topic.to_string());
        true
    }

    /// Append a topic at the end of the list unless it is already present.
    pub fn append(&mut self, topic: &str) -> bool {
        if self.contains(topic) {
            return false;
        }
        self.topics.push(topic.to_string());
        true
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.iter().any(|t| t == topic)
    }

    /// Whether fewer than `min_remaining` topics are left from the cursor.
    pub fn needs_lookahead(&self, min_remaining: usize) -> bool {
        self.topics_ahead() < min_remaining
    }

    /// Up to `n` distinct topics picked at random.
    pub fn sample(&self, n: usize) -> Vec<String> {
        self.topics
            .choose_multiple(&mut rand::thread_rng(), n.min(self.topics.len()))
            .cloned()
            .collect()
    }

    /// Back to the head of the list with a fresh countdown. Added topics are kept.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.remaining = self.draw_turns();
    }

    pub fn snapshot(&self) -> TopicsSnapshot {
        TopicsSnapshot {
            topics: self.topics.clone(),
            current_topic: self.current().to_string(),
            cursor: self.cursor,
        }
    }
}
