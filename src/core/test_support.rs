//! Scripted providers for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::core::llm::{ChatMessage, CompletionParams, LlmError, LlmResult, TextCompletion};
use crate::core::persona::VoiceConfig;
use crate::core::tts::{SpeechSynthesis, TTSError, TTSResult};

/// Completion provider that replays a script, then falls back to a fixed answer
/// (or an error when there is none).
pub(crate) struct ScriptedCompletion {
    script: Mutex<VecDeque<LlmResult<String>>>,
    fallback: Option<String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedCompletion {
    pub(crate) fn new(script: Vec<LlmResult<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn always(answer: &str) -> Self {
        Self {
            fallback: Some(answer.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub(crate) fn failing() -> Self {
        Self::new(Vec::new())
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl TextCompletion for ScriptedCompletion {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _params: &CompletionParams,
    ) -> LlmResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(messages.to_vec());

        if let Some(next) = self.script.lock().pop_front() {
            return next;
        }
        match self.fallback {
            Some(ref answer) => Ok(answer.clone()),
            None => Err(LlmError::RequestFailed("scripted failure".to_string())),
        }
    }
}

/// Speech provider with the same replay semantics as [`ScriptedCompletion`].
pub(crate) struct ScriptedSpeech {
    script: Mutex<VecDeque<TTSResult<Bytes>>>,
    fallback: Option<Bytes>,
    calls: AtomicUsize,
    texts: Mutex<Vec<String>>,
}

impl ScriptedSpeech {
    pub(crate) fn new(script: Vec<TTSResult<Bytes>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn always(audio: Vec<u8>) -> Self {
        Self {
            fallback: Some(Bytes::from(audio)),
            ..Self::new(Vec::new())
        }
    }

    pub(crate) fn failing() -> Self {
        Self::new(Vec::new())
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn texts(&self) -> Vec<String> {
        self.texts.lock().clone()
    }
}

#[async_trait]
impl SpeechSynthesis for ScriptedSpeech {
    async fn synthesize(&self, text: &str, _voice: &VoiceConfig) -> TTSResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().push(text.to_string());

        if let Some(next) = self.script.lock().pop_front() {
            return next;
        }
        match self.fallback {
            Some(ref audio) => Ok(audio.clone()),
            None => Err(TTSError::ProviderError {
                status: 503,
                message: "scripted failure".to_string(),
            }),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}
