//! Conversation state for one run of the program.
//!
//! Each backend has its own history, so switching from Anthropic to OpenAI
//! and back shows each model only its own conversation. Histories are
//! append-only (apart from an explicit clear) and live only as long as the
//! session; [`ChatSession::write_transcript`] can export them as JSON.

use crate::config::Backend;
use crate::error::ChatError;
use crate::output::ChatMessage;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Per-backend chat histories plus the currently selected backend.
#[derive(Debug, Clone)]
pub struct ChatSession {
    current: Backend,
    histories: HashMap<Backend, Vec<ChatMessage>>,
}

#[derive(Serialize)]
struct Transcript<'a> {
    current: Backend,
    histories: Vec<BackendHistory<'a>>,
}

#[derive(Serialize)]
struct BackendHistory<'a> {
    backend: Backend,
    messages: &'a [ChatMessage],
}

impl ChatSession {
    /// Start a session with an empty history for every backend in `backends`.
    ///
    /// The first backend becomes current; an empty list falls back to the
    /// default backend.
    pub fn new(backends: &[Backend]) -> Self {
        let current = backends.first().copied().unwrap_or_default();
        let mut histories: HashMap<Backend, Vec<ChatMessage>> =
            backends.iter().map(|b| (*b, Vec::new())).collect();
        histories.entry(current).or_default();
        Self { current, histories }
    }

    /// The backend new questions go to.
    pub fn current(&self) -> Backend {
        self.current
    }

    /// Switch backends. Returns true when the selection changed.
    pub fn select(&mut self, backend: Backend) -> bool {
        self.histories.entry(backend).or_default();
        if backend == self.current {
            return false;
        }
        debug!("Switching backend {} → {}", self.current, backend);
        self.current = backend;
        true
    }

    /// History of the current backend.
    pub fn history(&self) -> &[ChatMessage] {
        self.history_for(self.current)
    }

    pub fn history_for(&self, backend: Backend) -> &[ChatMessage] {
        self.histories.get(&backend).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.current_history_mut().push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.current_history_mut().push(ChatMessage::assistant(content));
    }

    /// Forget the current backend's conversation.
    pub fn clear_current(&mut self) {
        self.current_history_mut().clear();
    }

    fn current_history_mut(&mut self) -> &mut Vec<ChatMessage> {
        self.histories.entry(self.current).or_default()
    }

    /// All histories as pretty JSON, backends in a stable order.
    pub fn export_json(&self) -> Result<String, ChatError> {
        let mut backends: Vec<Backend> = self.histories.keys().copied().collect();
        backends.sort_by_key(|b| Backend::ALL.iter().position(|x| x == b));

        let transcript = Transcript {
            current: self.current,
            histories: backends
                .into_iter()
                .map(|backend| BackendHistory {
                    backend,
                    messages: self.history_for(backend),
                })
                .collect(),
        };
        serde_json::to_string_pretty(&transcript)
            .map_err(|e| ChatError::Internal(format!("serialise transcript: {e}")))
    }

    /// Write the transcript atomically (temp file + rename).
    pub async fn write_transcript(&self, path: &Path) -> Result<(), ChatError> {
        let json = self.export_json()?;
        let write_err = |source| ChatError::TranscriptWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await.map_err(write_err)?;
        tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
        Ok(())
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(&Backend::ALL)
    }
}
