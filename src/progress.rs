//! Progress-callback trait for chat events.
//!
//! Inject an [`Arc<dyn ChatProgressCallback>`] via
//! [`crate::config::ChatConfigBuilder::progress_callback`] to be told when
//! documents are loaded, the reference page is fetched, and the model is
//! called. The CLI uses it to drive a spinner; library callers can forward
//! the events anywhere.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfchat::{ChatConfig, ChatProgressCallback};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ChatProgressCallback for Printer {
//!     fn on_reply(&self, backend: &str, reply_len: usize) {
//!         eprintln!("{backend} answered with {reply_len} chars");
//!     }
//! }
//!
//! let config = ChatConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn ChatProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the library as a chat session progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ChatProgressCallback: Send + Sync {
    /// Called once the PDF has been split into documents.
    fn on_documents_loaded(&self, source: &str, document_count: usize) {
        let _ = (source, document_count);
    }

    /// Called before the reference page is requested.
    fn on_fetch_start(&self, url: &str) {
        let _ = url;
    }

    /// Called after the reference page has been converted to text.
    fn on_fetch_complete(&self, url: &str, text_len: usize) {
        let _ = (url, text_len);
    }

    /// Called just before the model request is sent.
    fn on_request_start(&self, backend: &str) {
        let _ = backend;
    }

    /// Called when the model returns a reply.
    fn on_reply(&self, backend: &str, reply_len: usize) {
        let _ = (backend, reply_len);
    }

    /// Called when a question fails.
    fn on_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ChatProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ChatConfig`].
pub type ProgressCallback = Arc<dyn ChatProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        fetches: AtomicUsize,
        replies: AtomicUsize,
        errors: AtomicUsize,
    }

    impl ChatProgressCallback for Counting {
        fn on_fetch_complete(&self, _url: &str, _text_len: usize) {
            self.fetches.fetch_add(1, Ordering::SeqCst);
        }

        fn on_reply(&self, _backend: &str, _reply_len: usize) {
            self.replies.fetch_add(1, Ordering::SeqCst);
        }

        fn on_error(&self, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_documents_loaded("doc.pdf", 3);
        cb.on_fetch_start("https://example.com");
        cb.on_fetch_complete("https://example.com", 10);
        cb.on_request_start("Anthropic");
        cb.on_reply("Anthropic", 42);
        cb.on_error("boom");
    }

    #[test]
    fn overridden_methods_receive_events() {
        let cb = Arc::new(Counting::default());
        let dyn_cb: ProgressCallback = cb.clone();
        dyn_cb.on_fetch_complete("u", 1);
        dyn_cb.on_reply("OpenAI", 5);
        dyn_cb.on_reply("OpenAI", 6);
        dyn_cb.on_error("x");
        dyn_cb.on_request_start("OpenAI");

        assert_eq!(cb.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(cb.replies.load(Ordering::SeqCst), 2);
        assert_eq!(cb.errors.load(Ordering::SeqCst), 1);
    }
}
