//! Web augmentation: fetch the reference page and convert it to text.
//!
//! HTML is reduced to the visible text of `<body>`; scripts, styles and
//! `noscript` fallbacks are dropped because they only add noise to the
//! prompt. Plain-text responses are passed through unchanged.

use crate::error::ChatError;
use crate::output::{Document, DocumentSource};
use crate::pipeline::segment::collapse_whitespace;
use scraper::{ElementRef, Html, Node, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A fetched page before conversion.
#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub url: String,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedContent {
    fn is_html(&self) -> bool {
        match self.content_type.as_deref() {
            Some(ct) => ct.contains("html"),
            // Sniff when the server does not say.
            None => {
                let trimmed = self.body.trim_start();
                let head = trimmed.get(..64).unwrap_or(trimmed).to_lowercase();
                head.starts_with("<!doctype html") || head.starts_with("<html")
            }
        }
    }
}

/// GET `url` and return the body as text.
pub async fn fetch_url(url: &str, timeout_secs: u64) -> Result<FetchedContent, ChatError> {
    debug!("Fetching {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("edgequake-pdfchat/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ChatError::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ChatError::FetchTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ChatError::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ChatError::FetchFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_lowercase);

    let body = response.text().await.map_err(|e| ChatError::FetchFailed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    Ok(FetchedContent {
        url: url.to_string(),
        content_type,
        body,
    })
}

/// Visible text of an HTML page, whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").expect("valid selector");

    let mut parts: Vec<String> = Vec::new();
    match document.select(&body_selector).next() {
        Some(body) => collect_text(body, &mut parts),
        None => collect_text(document.root_element(), &mut parts),
    }

    collapse_whitespace(&parts.join(" "))
}

fn collect_text(element: ElementRef<'_>, parts: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed.to_string());
                }
            }
            Node::Element(el) => {
                if matches!(el.name(), "script" | "style" | "noscript" | "template") {
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, parts);
                }
            }
            _ => {}
        }
    }
}

/// Convert fetched content into prompt documents (zero or one).
pub fn to_documents(content: &FetchedContent) -> Vec<Document> {
    let text = if content.is_html() {
        html_to_text(&content.body)
    } else {
        collapse_whitespace(&content.body)
    };

    if text.is_empty() {
        warn!("{} produced no text", content.url);
        return Vec::new();
    }
    vec![Document::new(text, DocumentSource::Web(content.url.clone()))]
}

/// Fetch `url` and convert it to prompt documents.
pub async fn fetch_documents(url: &str, timeout_secs: u64) -> Result<Vec<Document>, ChatError> {
    let content = fetch_url(url, timeout_secs).await?;
    let documents = to_documents(&content);
    info!(
        "Fetched {}: {} chars of text",
        url,
        documents.iter().map(|d| d.content.len()).sum::<usize>()
    );
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(ct: Option<&str>, body: &str) -> FetchedContent {
        FetchedContent {
            url: "https://example.com/page".into(),
            content_type: ct.map(str::to_string),
            body: body.into(),
        }
    }

    #[test]
    fn html_to_text_drops_scripts_and_styles() {
        let html = "<html><head><title>T</title><style>p{}</style></head>\
                    <body><h1>Prompt engineering</h1><script>var x = 1;</script>\
                    <p>Be   clear\nand direct.</p><noscript>enable js</noscript></body></html>";
        assert_eq!(html_to_text(html), "Prompt engineering Be clear and direct.");
    }

    #[test]
    fn html_to_text_handles_fragments() {
        assert_eq!(html_to_text("<p>Hello <b>world</b></p>"), "Hello world");
    }

    #[test]
    fn plain_text_passes_through() {
        let docs = to_documents(&content(Some("text/plain; charset=utf-8"), "line one\nline two"));
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "line one line two");
        assert!(docs[0].is_web());
    }

    #[test]
    fn html_is_sniffed_without_content_type() {
        let docs = to_documents(&content(None, "<!DOCTYPE html><html><body>Hi</body></html>"));
        assert_eq!(docs[0].content, "Hi");
    }

    #[test]
    fn empty_page_yields_no_documents() {
        let docs = to_documents(&content(Some("text/html"), "<html><body>  </body></html>"));
        assert!(docs.is_empty());
    }

    #[test]
    fn source_records_url() {
        let docs = to_documents(&content(Some("text/html"), "<body>x</body>"));
        assert_eq!(
            docs[0].source,
            DocumentSource::Web("https://example.com/page".into())
        );
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and hold connections without ever answering.
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let url = format!("http://{addr}/slow");
        let err = fetch_url(&url, 1).await.unwrap_err();
        assert!(matches!(err, ChatError::FetchTimeout { secs: 1, .. }), "got {err:?}");
    }
}
