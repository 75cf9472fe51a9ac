//! Durable side-logs: the transcript journal and the prompt log.
//!
//! The journal is a JSON array of every completed turn across sessions. A
//! missing or corrupt file is treated as an empty log and rewritten on the
//! next append.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::core::llm::ChatMessage;
use crate::core::transcript::Turn;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("Journal I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("Journal serialization error: {0}")]
    Serialization(String),
}

pub type JournalResult<T> = Result<T, JournalError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub persona_id: String,
    pub text: String,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
}

impl From<&Turn> for JournalEntry {
    fn from(turn: &Turn) -> Self {
        Self {
            persona_id: turn.persona_id.clone(),
            text: turn.text.clone(),
            timestamp: turn.timestamp.timestamp_millis() as f64 / 1000.0,
        }
    }
}

/// Append-only sink for completed turns.
#[async_trait]
pub trait TranscriptJournal: Send + Sync {
    async fn append(&self, entry: JournalEntry) -> JournalResult<()>;
}

/// Journal stored as a pretty-printed JSON array on disk.
pub struct JsonFileJournal {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current entries. Missing or unparsable files read as empty.
    pub async fn load(&self) -> Vec<JournalEntry> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_slice(&contents) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Journal is corrupt, starting fresh");
                Vec::new()
            }
        }
    }

    fn io_error(&self, e: std::io::Error) -> JournalError {
        JournalError::Io {
            path: self.path.display().to_string(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl TranscriptJournal for JsonFileJournal {
    async fn append(&self, entry: JournalEntry) -> JournalResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.load().await;
        entries.push(entry);

        let json = serde_json::to_vec_pretty(&entries)
            .map_err(|e| JournalError::Serialization(e.to_string()))?;

        // Readers must never observe a partially written array
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), entries = entries.len(), "Journal appended");
        Ok(())
    }
}

/// Keeps the most recent prompt sent to the dialogue model in a file.
pub struct PromptLog {
    path: PathBuf,
}

impl PromptLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Overwrite the log with `messages`. Failures are logged and ignored.
    pub async fn record(&self, messages: &[ChatMessage]) {
        let json = match serde_json::to_string_pretty(messages) {
            Ok(json) => json,
            Err(e) => {
                debug!(error = %e, "Could not serialize prompt");
                return;
            }
        };
        if let Err(e) = tokio::fs::write(&self.path, json).await {
            debug!(path = %self.path.display(), error = %e, "Could not write prompt log");
        }
    }
}
