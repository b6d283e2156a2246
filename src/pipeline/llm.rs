//! Model invocation: send the prompt to a chat-completion backend.
//!
//! [`ChatBackend`] is the seam between the chat engine and the outside
//! world. [`LlmBackend`] implements it on top of an `edgequake-llm`
//! provider (Anthropic, OpenAI, Ollama…); tests implement it with canned
//! replies.
//!
//! ## Retry Strategy
//!
//! By default a failed call is reported straight away. With
//! `max_retries > 0` the call is repeated with exponential backoff
//! (`retry_backoff_ms * 2^attempt`, capped at [`MAX_BACKOFF_MS`]); every
//! attempt is bounded by `api_timeout_secs`.

use crate::config::{Backend, ChatConfig};
use crate::error::ChatError;
use crate::output::{ChatMessage, Reply, Role};
use async_trait::async_trait;
use edgequake_llm::{CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Upper bound on the delay between two attempts.
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Sampling options for one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestOptions {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl RequestOptions {
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Something that can answer a list of chat messages.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Human-readable backend name used in logs and progress events.
    fn name(&self) -> &str;

    /// Send `messages` and return the reply.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &RequestOptions,
    ) -> Result<Reply, ChatError>;
}

/// [`ChatBackend`] backed by an `edgequake-llm` provider.
pub struct LlmBackend {
    label: String,
    provider: Arc<dyn LLMProvider>,
}

impl LlmBackend {
    pub fn new(label: impl Into<String>, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            label: label.into(),
            provider,
        }
    }
}

#[async_trait]
impl ChatBackend for LlmBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &RequestOptions,
    ) -> Result<Reply, ChatError> {
        let converted: Vec<edgequake_llm::ChatMessage> = messages.iter().map(to_llm_message).collect();
        let opts = CompletionOptions {
            temperature: Some(options.temperature),
            max_tokens: Some(options.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&converted, Some(&opts))
            .await
            .map_err(|e| ChatError::LlmApiError {
                message: e.to_string(),
            })?;

        Ok(Reply {
            content: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

fn to_llm_message(m: &ChatMessage) -> edgequake_llm::ChatMessage {
    match m.role {
        Role::System => edgequake_llm::ChatMessage::system(m.content.as_str()),
        Role::User => edgequake_llm::ChatMessage::user(m.content.as_str()),
        Role::Assistant => edgequake_llm::ChatMessage::assistant(m.content.as_str()),
    }
}

/// Halt early when no usable credentials are present.
///
/// Mirrors the startup check of a hosted-model app: if neither the Anthropic
/// nor the OpenAI key is set, nothing hosted can be reached. A backend that
/// needs no key (local Reflection-Llama) passes regardless.
pub fn check_credentials(backend: Backend) -> Result<(), ChatError> {
    check_credentials_with(backend, |var| std::env::var(var).ok())
}

fn check_credentials_with(
    backend: Backend,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ChatError> {
    let has = |var: &str| lookup(var).map(|v| !v.trim().is_empty()).unwrap_or(false);

    if backend.api_key_var().is_none() {
        return Ok(());
    }
    if !has("ANTHROPIC_API_KEY") && !has("OPENAI_API_KEY") {
        return Err(ChatError::MissingApiKeys);
    }
    if let Some(var) = backend.api_key_var() {
        if !has(var) {
            return Err(ChatError::ProviderNotConfigured {
                provider: backend.provider_name().to_string(),
                hint: format!("Set {var} to use the {} model.", backend.label()),
            });
        }
    }
    Ok(())
}

/// Create the backend for `backend`, honouring `config.provider` and `config.model`.
///
/// A pre-built provider in the config is used as-is. Otherwise the provider
/// is created by name through [`ProviderFactory`], which reads the matching
/// API key from the environment.
pub fn resolve_backend(config: &ChatConfig, backend: Backend) -> Result<Arc<dyn ChatBackend>, ChatError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::new(LlmBackend::new(backend.label(), Arc::clone(provider))));
    }

    check_credentials(backend)?;

    let model = if backend == config.backend {
        config.effective_model()
    } else {
        backend.default_model()
    };
    let provider = ProviderFactory::create_llm_provider(backend.provider_name(), model).map_err(|e| {
        ChatError::ProviderNotConfigured {
            provider: backend.provider_name().to_string(),
            hint: format!("{e}"),
        }
    })?;

    debug!("Created {} provider with model {}", backend.provider_name(), model);
    Ok(Arc::new(LlmBackend::new(backend.label(), provider)))
}

/// Delay before retry number `attempt` (1-based).
fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS)
}

/// Call the backend, retrying on failure as configured.
pub async fn complete_with_retry(
    backend: &dyn ChatBackend,
    messages: &[ChatMessage],
    config: &ChatConfig,
) -> Result<Reply, ChatError> {
    let options = RequestOptions::from_config(config);
    let mut last_err: Option<ChatError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_delay_ms(config.retry_backoff_ms, attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                backend.name(),
                attempt,
                config.max_retries,
                backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        let call = backend.complete(messages, &options);
        let result = match timeout(Duration::from_secs(config.api_timeout_secs), call).await {
            Ok(r) => r,
            Err(_) => Err(ChatError::ApiTimeout {
                secs: config.api_timeout_secs,
            }),
        };

        match result {
            Ok(reply) if reply.content.trim().is_empty() => {
                warn!("{}: attempt {} returned an empty reply", backend.name(), attempt + 1);
                last_err = Some(ChatError::EmptyReply);
            }
            Ok(reply) => {
                debug!(
                    "{}: {} input tokens, {} output tokens",
                    backend.name(),
                    reply.input_tokens,
                    reply.output_tokens
                );
                return Ok(reply);
            }
            Err(e) => {
                warn!("{}: attempt {} failed: {}", backend.name(), attempt + 1, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| ChatError::Internal("no attempt was made".into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<Vec<Result<Reply, ChatError>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(mut replies: Vec<Result<Reply, ChatError>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _: &[ChatMessage], _: &RequestOptions) -> Result<Reply, ChatError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(ChatError::Internal("script exhausted".into())))
        }
    }

    fn ok(text: &str) -> Result<Reply, ChatError> {
        Ok(Reply {
            content: text.into(),
            input_tokens: 10,
            output_tokens: 3,
        })
    }

    fn api_err() -> Result<Reply, ChatError> {
        Err(ChatError::LlmApiError {
            message: "overloaded".into(),
        })
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[tokio::test]
    async fn no_retry_by_default() {
        let backend = Scripted::new(vec![api_err(), ok("late")]);
        let config = ChatConfig::default();
        let err = complete_with_retry(&backend, &[], &config).await.unwrap_err();
        assert!(matches!(err, ChatError::LlmApiError { .. }));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let backend = Scripted::new(vec![api_err(), api_err(), ok("answer")]);
        let config = ChatConfig::builder()
            .max_retries(2)
            .retry_backoff_ms(1)
            .build()
            .unwrap();
        let reply = complete_with_retry(&backend, &[], &config).await.unwrap();
        assert_eq!(reply.content, "answer");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_reply_is_an_error() {
        let backend = Scripted::new(vec![ok("   ")]);
        let err = complete_with_retry(&backend, &[], &ChatConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::EmptyReply));
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_delay_ms(500, 1), 500);
        assert_eq!(backoff_delay_ms(500, 3), 2000);
        assert_eq!(backoff_delay_ms(500, 70), MAX_BACKOFF_MS);
        assert_eq!(backoff_delay_ms(u64::MAX, u32::MAX), MAX_BACKOFF_MS);
        assert_eq!(backoff_delay_ms(0, 100), 0);
    }

    #[tokio::test]
    async fn many_retries_do_not_overflow() {
        let backend = Scripted::new(Vec::new());
        let config = ChatConfig::builder()
            .max_retries(70)
            .retry_backoff_ms(0)
            .build()
            .unwrap();
        let err = complete_with_retry(&backend, &[], &config).await.unwrap_err();
        assert!(matches!(err, ChatError::Internal(_)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 71);
    }

    struct Stalled;

    #[async_trait]
    impl ChatBackend for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn complete(&self, _: &[ChatMessage], _: &RequestOptions) -> Result<Reply, ChatError> {
            sleep(Duration::from_secs(30)).await;
            Ok(Reply::default())
        }
    }

    #[tokio::test]
    async fn slow_backend_hits_api_timeout() {
        let config = ChatConfig::builder().api_timeout_secs(1).build().unwrap();
        let err = complete_with_retry(&Stalled, &[], &config).await.unwrap_err();
        assert!(matches!(err, ChatError::ApiTimeout { secs: 1 }));
    }

    #[test]
    fn missing_both_keys_halts() {
        let err = check_credentials_with(Backend::Anthropic, env(&[])).unwrap_err();
        assert!(matches!(err, ChatError::MissingApiKeys));
    }

    #[test]
    fn selected_backend_key_required() {
        let err =
            check_credentials_with(Backend::Anthropic, env(&[("OPENAI_API_KEY", "sk-x")])).unwrap_err();
        assert!(matches!(err, ChatError::ProviderNotConfigured { ref provider, .. } if provider == "anthropic"));
        assert!(check_credentials_with(Backend::OpenAi, env(&[("OPENAI_API_KEY", "sk-x")])).is_ok());
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let err = check_credentials_with(Backend::OpenAi, env(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ChatError::MissingApiKeys));
    }

    #[test]
    fn local_backend_needs_no_key() {
        assert!(check_credentials_with(Backend::ReflectionLlama, env(&[])).is_ok());
    }

    #[test]
    fn options_follow_config() {
        let config = ChatConfig::builder().temperature(0.2).max_tokens(64).build().unwrap();
        let opts = RequestOptions::from_config(&config);
        assert_eq!(opts.temperature, 0.2);
        assert_eq!(opts.max_tokens, 64);
    }
}
