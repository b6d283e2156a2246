//! Configuration types for a PDF chat session.
//!
//! All behaviour is controlled through [`ChatConfig`], built via its
//! [`ChatConfigBuilder`]. The binary maps CLI flags onto the builder; library
//! callers set only the knobs they care about and rely on the defaults for
//! the rest.

use crate::error::ChatError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// File name of the PDF loaded when the user does not supply one.
pub const DEFAULT_PDF_NAME: &str = "principals_ethic_ai.pdf";

/// Page fetched and appended to the prompt on every question.
pub const DEFAULT_REFERENCE_URL: &str =
    "https://docs.anthropic.com/en/docs/build-with-claude/prompt-engineering/overview";

/// Configuration for a chat session.
///
/// # Example
/// ```rust
/// use edgequake_pdfchat::{Backend, ChatConfig, ReplyFormat};
///
/// let config = ChatConfig::builder()
///     .backend(Backend::OpenAi)
///     .reply_format(ReplyFormat::Markdown)
///     .augment_with_web(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.effective_model(), "gpt-3.5-turbo");
/// ```
#[derive(Clone)]
pub struct ChatConfig {
    /// Model backend answering questions. Default: [`Backend::Anthropic`].
    pub backend: Backend,

    /// Model identifier overriding the backend's default.
    pub model: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `backend`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// PDF loaded when no other PDF is supplied.
    pub default_pdf: PathBuf,

    /// Reference page fetched for every question.
    pub reference_url: String,

    /// Append the reference page's text to the prompt. Default: true.
    pub augment_with_web: bool,

    /// Custom system prompt. If None, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// How extracted PDF text is cut into documents. Default: one per page.
    pub chunk_mode: ChunkMode,

    /// Post-processing applied to each reply. If None, each backend uses its
    /// [`Backend::preferred_format`].
    pub reply_format: Option<ReplyFormat>,

    /// Sampling temperature. Range 0.0–2.0. Default: 0.7.
    pub temperature: f32,

    /// Maximum tokens the model may generate per answer. Default: 1024.
    pub max_tokens: usize,

    /// Extra attempts after a failed model call. Default: 0.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Timeout for fetching the reference page. Default: 30.
    pub fetch_timeout_secs: u64,

    /// Timeout for one model call. Default: 120.
    pub api_timeout_secs: u64,

    /// Observer for load/fetch/request events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            model: None,
            provider: None,
            default_pdf: PathBuf::from(DEFAULT_PDF_NAME),
            reference_url: DEFAULT_REFERENCE_URL.to_string(),
            augment_with_web: true,
            system_prompt: None,
            chunk_mode: ChunkMode::default(),
            reply_format: None,
            temperature: 0.7,
            max_tokens: 1024,
            max_retries: 0,
            retry_backoff_ms: 500,
            fetch_timeout_secs: 30,
            api_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("backend", &self.backend)
            .field("model", &self.model)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("default_pdf", &self.default_pdf)
            .field("reference_url", &self.reference_url)
            .field("augment_with_web", &self.augment_with_web)
            .field("chunk_mode", &self.chunk_mode)
            .field("reply_format", &self.reply_format)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl ChatConfig {
    /// Create a new builder for `ChatConfig`.
    pub fn builder() -> ChatConfigBuilder {
        ChatConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model sent to the provider: explicit override or the backend default.
    pub fn effective_model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.backend.default_model())
    }

    /// The format applied to replies from `backend`.
    pub fn format_for(&self, backend: Backend) -> ReplyFormat {
        self.reply_format
            .unwrap_or_else(|| backend.preferred_format())
    }
}

/// Builder for [`ChatConfig`].
pub struct ChatConfigBuilder {
    config: ChatConfig,
}

impl ChatConfigBuilder {
    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn default_pdf(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.default_pdf = path.into();
        self
    }

    pub fn reference_url(mut self, url: impl Into<String>) -> Self {
        self.config.reference_url = url.into();
        self
    }

    pub fn augment_with_web(mut self, v: bool) -> Self {
        self.config.augment_with_web = v;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn chunk_mode(mut self, mode: ChunkMode) -> Self {
        self.config.chunk_mode = mode;
        self
    }

    pub fn reply_format(mut self, format: ReplyFormat) -> Self {
        self.config.reply_format = Some(format);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ChatConfig, ChatError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(ChatError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.augment_with_web
            && !(c.reference_url.starts_with("http://") || c.reference_url.starts_with("https://"))
        {
            return Err(ChatError::InvalidConfig(format!(
                "reference URL must be http(s), got '{}'",
                c.reference_url
            )));
        }
        if c.api_timeout_secs == 0 || c.fetch_timeout_secs == 0 {
            return Err(ChatError::InvalidConfig("timeouts must be ≥ 1s".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The model backend a question is sent to.
///
/// Each backend keeps its own conversation history in
/// [`crate::session::ChatSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Backend {
    /// Anthropic Claude (default).
    #[default]
    Anthropic,
    /// OpenAI GPT.
    OpenAi,
    /// Reflection-Llama, an open-weights model served locally through Ollama.
    ReflectionLlama,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Anthropic, Backend::OpenAi, Backend::ReflectionLlama];

    /// Name shown to the user.
    pub fn label(&self) -> &'static str {
        match self {
            Backend::Anthropic => "Anthropic",
            Backend::OpenAi => "OpenAI",
            Backend::ReflectionLlama => "Reflection-Llama",
        }
    }

    /// Provider name understood by `edgequake_llm::ProviderFactory`.
    pub fn provider_name(&self) -> &'static str {
        match self {
            Backend::Anthropic => "anthropic",
            Backend::OpenAi => "openai",
            Backend::ReflectionLlama => "ollama",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Backend::Anthropic => "claude-3-5-sonnet-20240620",
            Backend::OpenAi => "gpt-3.5-turbo",
            Backend::ReflectionLlama => "reflection",
        }
    }

    /// Environment variable holding the API key, if the backend needs one.
    pub fn api_key_var(&self) -> Option<&'static str> {
        match self {
            Backend::Anthropic => Some("ANTHROPIC_API_KEY"),
            Backend::OpenAi => Some("OPENAI_API_KEY"),
            Backend::ReflectionLlama => None,
        }
    }

    /// Reply format the original variant of this backend used.
    pub fn preferred_format(&self) -> ReplyFormat {
        match self {
            Backend::Anthropic | Backend::OpenAi => ReplyFormat::Bullets,
            Backend::ReflectionLlama => ReplyFormat::Plain,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Backend {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Backend::Anthropic),
            "openai" | "gpt" => Ok(Backend::OpenAi),
            "reflection-llama" | "reflection" | "llama" => Ok(Backend::ReflectionLlama),
            _ => Err(ChatError::UnknownBackend(s.trim().to_string())),
        }
    }
}

/// How extracted PDF text is split into prompt documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChunkMode {
    /// One document per non-blank page (default).
    #[default]
    Pages,
    /// One document per sentence.
    Sentences,
}

/// Post-processing applied to the model's reply before display and storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReplyFormat {
    /// Reply kept verbatim.
    Plain,
    /// Reply split into bullet points and wrapped in an HTML list (default).
    #[default]
    Bullets,
    /// Reply split into bullet points rendered as a Markdown list.
    Markdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_app() {
        let c = ChatConfig::default();
        assert_eq!(c.backend, Backend::Anthropic);
        assert_eq!(c.default_pdf, PathBuf::from("principals_ethic_ai.pdf"));
        assert!(c.augment_with_web);
        assert_eq!(c.max_retries, 0);
        assert_eq!(c.reply_format, None);
        assert_eq!(c.format_for(Backend::Anthropic), ReplyFormat::Bullets);
    }

    #[test]
    fn reply_format_follows_backend_unless_set() {
        let c = ChatConfig::builder()
            .backend(Backend::ReflectionLlama)
            .build()
            .unwrap();
        assert_eq!(c.format_for(Backend::ReflectionLlama), ReplyFormat::Plain);
        assert_eq!(c.format_for(Backend::OpenAi), ReplyFormat::Bullets);

        let c = ChatConfig::builder()
            .reply_format(ReplyFormat::Markdown)
            .build()
            .unwrap();
        assert_eq!(c.format_for(Backend::ReflectionLlama), ReplyFormat::Markdown);
    }

    #[test]
    fn backend_parses_labels_and_aliases() {
        assert_eq!("Anthropic".parse::<Backend>().unwrap(), Backend::Anthropic);
        assert_eq!(" OpenAI ".parse::<Backend>().unwrap(), Backend::OpenAi);
        assert_eq!(
            "Reflection-Llama".parse::<Backend>().unwrap(),
            Backend::ReflectionLlama
        );
        assert_eq!("claude".parse::<Backend>().unwrap(), Backend::Anthropic);
        assert!(matches!(
            "mistral".parse::<Backend>(),
            Err(ChatError::UnknownBackend(name)) if name == "mistral"
        ));
    }

    #[test]
    fn backend_label_round_trips() {
        for b in Backend::ALL {
            assert_eq!(b.label().parse::<Backend>().unwrap(), b);
        }
    }

    #[test]
    fn model_override_wins() {
        let c = ChatConfig::builder()
            .backend(Backend::OpenAi)
            .model("gpt-4o")
            .build()
            .unwrap();
        assert_eq!(c.effective_model(), "gpt-4o");
    }

    #[test]
    fn temperature_is_clamped() {
        let c = ChatConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn rejects_non_http_reference_url() {
        let err = ChatConfig::builder()
            .reference_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, ChatError::InvalidConfig(_)));
    }

    #[test]
    fn non_http_url_allowed_when_web_disabled() {
        assert!(ChatConfig::builder()
            .reference_url("")
            .augment_with_web(false)
            .build()
            .is_ok());
    }

    #[test]
    fn rejects_zero_max_tokens() {
        assert!(ChatConfig::builder().max_tokens(0).build().is_err());
    }
}
