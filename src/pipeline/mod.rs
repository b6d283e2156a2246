//! Pipeline stages for answering a question about a PDF.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ segment ──┐
//! (path/URL) (pdfium)  (pages/     ├──▶ prompt ──▶ llm ──▶ format
//!                       sentences) │
//!                        fetch ────┘
//!                       (URL→text)
//! ```
//!
//! 1. [`input`]   — resolve the user-supplied path or URL (or the default PDF) to bytes
//! 2. [`extract`] — per-page text via pdfium; runs in `spawn_blocking`
//! 3. [`segment`] — drop blank pages, optionally split into sentences
//! 4. [`fetch`]   — download the reference page and reduce its HTML to text
//! 5. [`llm`]     — call the chat backend with timeout and optional retry
//! 6. [`format`]  — turn the raw reply into its display form

pub mod extract;
pub mod fetch;
pub mod format;
pub mod input;
pub mod llm;
pub mod segment;
