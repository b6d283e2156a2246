//! # edgequake-pdfchat
//!
//! Ask questions about a PDF document and get answers from a hosted LLM.
//!
//! The text of the PDF is extracted page by page, combined with the text of a
//! reference web page, and sent to the selected model together with the
//! question. Replies are post-processed into a bullet list and kept in a
//! per-model conversation history.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve --pdf, a URL, or principals_ethic_ai.pdf
//!  ├─ 2. Extract  per-page text via pdfium (spawn_blocking), blank pages skipped
//!  ├─ 3. Segment  one document per page, or per sentence
//!  ├─ 4. Fetch    reference URL → HTML → text document
//!  ├─ 5. Prompt   fixed system message + documents + question
//!  ├─ 6. Model    Anthropic / OpenAI / Reflection-Llama (Ollama)
//!  └─ 7. Format   bullets (HTML or Markdown) or verbatim
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfchat::{load_documents, ChatConfig, ChatEngine, ChatSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Uses ANTHROPIC_API_KEY by default.
//!     let config = ChatConfig::default();
//!     let loaded = load_documents(&config, Some("report.pdf")).await?;
//!     let engine = ChatEngine::new(config, loaded.documents)?.connect()?;
//!
//!     let mut session = ChatSession::default();
//!     let answer = engine.ask(&mut session, "What are the key principles?").await?;
//!     println!("{}", answer.content);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfchat` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod chat;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use chat::{load_documents, ChatEngine, LoadedDocuments};
pub use config::{Backend, ChatConfig, ChatConfigBuilder, ChunkMode, ReplyFormat};
pub use error::ChatError;
pub use output::{Answer, ChatMessage, Document, DocumentSource, PdfSummary, Reply, Role};
pub use pipeline::input::{export_default_pdf, load_pdf, PdfSource};
pub use pipeline::llm::{ChatBackend, LlmBackend, RequestOptions};
pub use progress::{ChatProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::ChatSession;
pub use stream::reply_stream;
