//! Error types for the edgequake-pdfchat library.
//!
//! Every failure is fatal for the operation that raised it, but the scope of
//! "fatal" differs:
//!
//! * Setup errors (PDF missing, no API key, bad configuration) stop the
//!   program before the chat loop starts.
//! * Request errors (fetch failed, model API error) abort a single question.
//!   The chat loop reports them verbatim and waits for the next question.
//!
//! [`ChatError::is_setup_error`] tells the caller which of the two it holds.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-pdfchat library.
#[derive(Debug, Error)]
pub enum ChatError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not usable (blank question, bad path or URL).
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// The bytes read are not a PDF.
    #[error("'{source_name}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { source_name: String, magic: [u8; 4] },

    /// No PDF was given and the default PDF is not on disk.
    #[error("Default PDF not found at '{path}'. Please provide a PDF file with --pdf.")]
    DefaultPdfMissing { path: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{source_name}' is corrupt: {detail}")]
    CorruptPdf { source_name: String, detail: String },

    /// PDF requires a password; encrypted documents are not supported.
    #[error("PDF '{source_name}' is encrypted and cannot be read.")]
    PasswordRequired { source_name: String },

    /// Every page of the PDF was blank, so there is nothing to chat about.
    #[error("No text could be extracted from the PDF. Please upload a PDF file with selectable text.")]
    NoDocuments,

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If the auto-download failed, you can:\n\
  • Check your internet connection and try again.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Web errors ────────────────────────────────────────────────────────
    /// The reference page could not be fetched.
    #[error("Failed to fetch '{url}': {reason}")]
    FetchFailed { url: String, reason: String },

    /// The reference page fetch exceeded the configured timeout.
    #[error("Fetching '{url}' timed out after {secs}s")]
    FetchTimeout { url: String, secs: u64 },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// Neither provider key is present in the environment.
    #[error("API keys for Anthropic and OpenAI are not set in environment variables.\nSet ANTHROPIC_API_KEY or OPENAI_API_KEY.")]
    MissingApiKeys,

    /// The configured provider could not be created.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The backend name given by the user does not match any backend.
    #[error("Invalid model choice '{0}'. Please select either 'Anthropic', 'OpenAI' or 'Reflection-Llama'.")]
    UnknownBackend(String),

    /// The LLM API returned an error.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The LLM call did not finish in time.
    #[error("LLM call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    /// The model answered with nothing.
    #[error("The model returned an empty reply")]
    EmptyReply,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write the conversation transcript.
    #[error("Failed to write transcript '{path}': {source}")]
    TranscriptWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// True for errors that must stop the program before any question is asked.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            ChatError::FileNotFound { .. }
                | ChatError::PermissionDenied { .. }
                | ChatError::NotAPdf { .. }
                | ChatError::DefaultPdfMissing { .. }
                | ChatError::CorruptPdf { .. }
                | ChatError::PasswordRequired { .. }
                | ChatError::NoDocuments
                | ChatError::PdfiumBindingFailed(_)
                | ChatError::MissingApiKeys
                | ChatError::ProviderNotConfigured { .. }
                | ChatError::UnknownBackend(_)
                | ChatError::InvalidConfig(_)
        )
    }

    /// The message shown to the user when a single question fails.
    pub fn user_message(&self) -> String {
        format!("An error occurred: {self}")
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_mentions_both_providers() {
        let msg = ChatError::MissingApiKeys.to_string();
        assert!(msg.contains("Anthropic"));
        assert!(msg.contains("OpenAI"));
    }

    #[test]
    fn user_message_wraps_error_verbatim() {
        let e = ChatError::LlmApiError {
            message: "overloaded".into(),
        };
        assert_eq!(e.user_message(), "An error occurred: LLM API error: overloaded");
    }

    #[test]
    fn fetch_timeout_display() {
        let e = ChatError::FetchTimeout {
            url: "https://example.com".into(),
            secs: 30,
        };
        assert!(e.to_string().contains("30s"));
        assert!(e.to_string().contains("example.com"));
    }

    #[test]
    fn request_errors_are_not_setup_errors() {
        assert!(!ChatError::EmptyReply.is_setup_error());
        assert!(!ChatError::ApiTimeout { secs: 5 }.is_setup_error());
        assert!(ChatError::MissingApiKeys.is_setup_error());
        assert!(ChatError::DefaultPdfMissing {
            path: "x.pdf".into()
        }
        .is_setup_error());
    }
}
