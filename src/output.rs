//! Data types shared across the pipeline: documents, chat messages, answers.

use crate::config::ReplyFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a document's text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentSource {
    /// A whole PDF page (1-indexed).
    Page(usize),
    /// One sentence of a PDF page (both 1-indexed).
    Sentence { page: usize, index: usize },
    /// Text converted from a fetched web page.
    Web(String),
}

/// A chunk of text injected into the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub source: DocumentSource,
}

impl Document {
    pub fn new(content: impl Into<String>, source: DocumentSource) -> Self {
        Self {
            content: content.into(),
            source,
        }
    }

    pub fn is_web(&self) -> bool {
        matches!(self.source, DocumentSource::Web(_))
    }
}

/// Summary of a loaded PDF, printed by `pdfchat --inspect-only`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfSummary {
    /// Name of the file or URL the bytes came from.
    pub source_name: String,
    pub page_count: usize,
    /// Pages with any non-whitespace text.
    pub text_pages: usize,
    pub byte_len: usize,
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        })
    }
}

/// One turn of a conversation or prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The raw result of one model call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reply {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// A formatted answer to one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Reply after [`crate::pipeline::format::format_reply`]; this is what
    /// is stored in the session history.
    pub content: String,
    /// Reply exactly as the model produced it.
    pub raw: String,
    /// Format `content` was rendered in.
    pub format: ReplyFormat,
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// Number of web documents included in the prompt.
    pub web_documents: usize,
    pub duration_ms: u64,
}
