//! Question answering over a loaded PDF.
//!
//! [`ChatEngine`] owns the extracted documents and one backend per model
//! choice. [`ChatEngine::ask`] runs the whole per-question flow:
//!
//! ```text
//! question ──▶ history ──▶ fetch reference page ──▶ prompt ──▶ model ──▶ format ──▶ history
//! ```
//!
//! A failed question leaves the user's message in the history and adds no
//! assistant message.

use crate::config::{Backend, ChatConfig};
use crate::error::ChatError;
use crate::output::{Answer, Document};
use crate::pipeline::{extract, fetch, format, input, llm};
use crate::pipeline::llm::ChatBackend;
use crate::prompts;
use crate::session::ChatSession;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Documents loaded from a PDF, with where they came from.
#[derive(Debug, Clone)]
pub struct LoadedDocuments {
    pub source_name: String,
    pub is_default: bool,
    pub documents: Vec<Document>,
}

/// Resolve the session's PDF and extract its documents.
///
/// `upload` (a path or URL) wins over the configured default PDF.
pub async fn load_documents(
    config: &ChatConfig,
    upload: Option<&str>,
) -> Result<LoadedDocuments, ChatError> {
    let source = input::resolve_pdf(config, upload, config.fetch_timeout_secs).await?;
    let documents = extract::read_documents_from_pdf(&source, config.chunk_mode).await?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_documents_loaded(&source.name, documents.len());
    }

    Ok(LoadedDocuments {
        source_name: source.name,
        is_default: source.is_default,
        documents,
    })
}

/// Answers questions about a fixed set of documents.
pub struct ChatEngine {
    config: ChatConfig,
    documents: Vec<Document>,
    backends: HashMap<Backend, Arc<dyn ChatBackend>>,
}

impl ChatEngine {
    /// Create an engine with no backends yet; add them with [`Self::with_backend`].
    ///
    /// Fails with [`ChatError::NoDocuments`] when `documents` is empty.
    pub fn new(config: ChatConfig, documents: Vec<Document>) -> Result<Self, ChatError> {
        if documents.is_empty() {
            return Err(ChatError::NoDocuments);
        }
        Ok(Self {
            config,
            documents,
            backends: HashMap::new(),
        })
    }

    /// Register the backend that answers for `choice`.
    pub fn with_backend(mut self, choice: Backend, backend: Arc<dyn ChatBackend>) -> Self {
        self.backends.insert(choice, backend);
        self
    }

    /// Create the configured backend through the provider factory.
    pub fn connect(self) -> Result<Self, ChatError> {
        let choice = self.config.backend;
        let backend = llm::resolve_backend(&self.config, choice)?;
        Ok(self.with_backend(choice, backend))
    }

    /// Make sure a backend exists for `choice`, creating it on first use.
    pub fn ensure_backend(&mut self, choice: Backend) -> Result<(), ChatError> {
        if !self.backends.contains_key(&choice) {
            let backend = llm::resolve_backend(&self.config, choice)?;
            self.backends.insert(choice, backend);
        }
        Ok(())
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Answer `question` with the session's current backend.
    pub async fn ask(&self, session: &mut ChatSession, question: &str) -> Result<Answer, ChatError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::InvalidInput {
                input: String::new(),
                reason: "question is empty".into(),
            });
        }

        let choice = session.current();
        let backend = self
            .backends
            .get(&choice)
            .cloned()
            .ok_or_else(|| ChatError::ProviderNotConfigured {
                provider: choice.provider_name().to_string(),
                hint: format!("No backend has been connected for {choice}."),
            })?;

        session.push_user(question);

        match self.answer(backend.as_ref(), choice, question).await {
            Ok(answer) => {
                session.push_assistant(answer.content.clone());
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_reply(backend.name(), answer.raw.len());
                }
                Ok(answer)
            }
            Err(e) => {
                warn!("Question failed on {}: {}", choice, e);
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_error(&e.to_string());
                }
                Err(e)
            }
        }
    }

    async fn answer(
        &self,
        backend: &dyn ChatBackend,
        choice: Backend,
        question: &str,
    ) -> Result<Answer, ChatError> {
        let start = Instant::now();

        // ── Step 1: Web augmentation ─────────────────────────────────────
        let web_documents = if self.config.augment_with_web {
            self.fetch_reference().await?
        } else {
            Vec::new()
        };

        // ── Step 2: Prompt ───────────────────────────────────────────────
        let mut documents = self.documents.clone();
        documents.extend(web_documents.iter().cloned());
        let system_prompt = self.config.system_prompt.as_deref();
        let messages = match choice {
            Backend::ReflectionLlama => prompts::build_inline_messages(system_prompt, &documents, question),
            Backend::Anthropic | Backend::OpenAi => {
                prompts::build_messages(system_prompt, &documents, question)
            }
        };

        // ── Step 3: Model ────────────────────────────────────────────────
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_request_start(backend.name());
        }
        let reply = llm::complete_with_retry(backend, &messages, &self.config).await?;

        // ── Step 4: Format ───────────────────────────────────────────────
        let reply_format = self.config.format_for(choice);
        let content = format::format_reply(&reply.content, reply_format);
        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "{} answered in {}ms ({} in / {} out tokens)",
            backend.name(),
            duration_ms,
            reply.input_tokens,
            reply.output_tokens
        );

        Ok(Answer {
            content,
            raw: reply.content,
            format: reply_format,
            input_tokens: reply.input_tokens,
            output_tokens: reply.output_tokens,
            web_documents: web_documents.len(),
            duration_ms,
        })
    }

    async fn fetch_reference(&self) -> Result<Vec<Document>, ChatError> {
        let url = &self.config.reference_url;
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_fetch_start(url);
        }
        let docs = fetch::fetch_documents(url, self.config.fetch_timeout_secs).await?;
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_fetch_complete(url, docs.iter().map(|d| d.content.len()).sum());
        }
        Ok(docs)
    }
}
