//! Prompt text and prompt assembly.
//!
//! Every string sent to the model lives here so the wording can be changed
//! and tested in one place. Callers can override the system prompt via
//! [`crate::config::ChatConfig::system_prompt`].

use crate::output::{ChatMessage, Document};

/// Default system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a prompt expert who answers questions based on the given documents.";

/// Header that opens the user message.
pub const DOCUMENTS_HEADER: &str = "Here are the documents:\n";

/// Build the prompt for one question.
///
/// The user message lists every document on its own indented block, then
/// the question:
///
/// ```text
/// Here are the documents:
///
///     <document 1>
///
///     <document 2>
///
/// Answer: <query>
/// ```
pub fn build_messages(
    system_prompt: Option<&str>,
    documents: &[Document],
    query: &str,
) -> Vec<ChatMessage> {
    let mut user = String::from(DOCUMENTS_HEADER);
    for d in documents {
        user.push_str(" \n    ");
        user.push_str(&d.content);
        user.push_str(" \n");
    }
    user.push_str("\nAnswer: ");
    user.push_str(query);

    vec![
        ChatMessage::system(system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT)),
        ChatMessage::user(user),
    ]
}

/// Compact variant: documents joined by a single newline, no indentation.
///
/// Smaller local models follow this layout more reliably and it costs fewer
/// tokens.
pub fn build_inline_messages(
    system_prompt: Option<&str>,
    documents: &[Document],
    query: &str,
) -> Vec<ChatMessage> {
    let joined = documents
        .iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    vec![
        ChatMessage::system(system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT)),
        ChatMessage::user(format!("{DOCUMENTS_HEADER}{joined}\nAnswer: {query}")),
    ]
}
