//! Post-processing: turn a raw model reply into its display form.
//!
//! Models like to answer with `•` bullets or `- ` lists embedded in running
//! text. The bullet formats split the reply on those markers and rebuild a
//! proper list, either as an HTML `<ul>` (for HTML-capable front-ends) or
//! as Markdown. Before splitting, a couple of cheap cleanup rules run so the
//! split sees normalised input.
//!
//! ## Rule Order
//!
//! 1. Strip outer markdown fences
//! 2. Normalise line endings (CRLF → LF)
//! 3. Replace `•` with `\n- `
//! 4. Split on `- `, trim each piece, drop empty pieces
//! 5. Render the pieces as a list

use crate::config::ReplyFormat;
use once_cell::sync::Lazy;
use regex::Regex;

/// Apply the configured format to a raw reply.
pub fn format_reply(raw: &str, format: ReplyFormat) -> String {
    match format {
        ReplyFormat::Plain => raw.to_string(),
        ReplyFormat::Bullets => format_bullets(raw),
        ReplyFormat::Markdown => format_markdown(raw),
    }
}

/// Render a reply as an indented HTML bullet list.
pub fn format_bullets(raw: &str) -> String {
    let items: String = bullet_items(raw)
        .iter()
        .map(|item| format!("<li>{item}</li>"))
        .collect();
    format!("<div style='margin-left: 20px;'><ul>{items}</ul></div>")
}

/// Render a reply as a Markdown bullet list.
pub fn format_markdown(raw: &str) -> String {
    bullet_items(raw)
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split a reply into list items (rules 1–4).
pub fn bullet_items(raw: &str) -> Vec<String> {
    let s = strip_markdown_fences(raw);
    let s = normalise_line_endings(&s);
    let s = s.replace('•', "\n- ");
    s.split("- ")
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\n(.*)\n```\s*$").expect("valid regex"));

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Terminal rendering ───────────────────────────────────────────────────────

static RE_LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"<li>").expect("valid regex"));
static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Render an HTML-formatted reply for a plain terminal.
///
/// Each `<li>` becomes a `• ` line; all other tags are dropped and the common
/// entities decoded.
pub fn strip_html(input: &str) -> String {
    let s = RE_LIST_ITEM.replace_all(input, "\n• ");
    let s = RE_TAG.replace_all(&s, "");
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
