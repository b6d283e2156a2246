//! End-to-end tests for edgequake-pdfchat.
//!
//! These tests need the pdfium library, real PDF files in `./test_cases/`,
//! network access, and (for the chat tests) live API keys. They are gated
//! behind the `E2E_ENABLED` environment variable so they do not run in CI
//! unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture

use edgequake_pdfchat::pipeline::{extract, fetch};
use edgequake_pdfchat::{
    load_documents, load_pdf, Backend, ChatConfig, ChatEngine, ChatSession, ChunkMode,
    DocumentSource, ReplyFormat,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        init_logging();
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Route library logs to the test output; `RUST_LOG` overrides the level.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("edgequake_pdfchat=debug")),
        )
        .with_test_writer()
        .try_init();
}

fn has_key(var: &str) -> bool {
    std::env::var(var).map(|v| !v.is_empty()).unwrap_or(false)
}

// ── Extraction (pdfium, no LLM) ──────────────────────────────────────────────

#[tokio::test]
async fn test_extract_default_pdf_pages() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("principals_ethic_ai.pdf"));

    let source = load_pdf(path.to_str().unwrap(), 30).await.expect("load");
    let summary = extract::inspect(&source).await.expect("inspect");
    assert!(summary.page_count >= 1);
    assert!(summary.text_pages <= summary.page_count);

    let docs = extract::read_documents_from_pdf(&source, ChunkMode::Pages)
        .await
        .expect("extract");
    assert_eq!(docs.len(), summary.text_pages, "one document per text page");
    assert!(docs.iter().all(|d| !d.content.trim().is_empty()));
    assert!(matches!(docs[0].source, DocumentSource::Page(_)));
}

#[tokio::test]
async fn test_extract_sentences() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("principals_ethic_ai.pdf"));

    let source = load_pdf(path.to_str().unwrap(), 30).await.expect("load");
    let pages = extract::read_documents_from_pdf(&source, ChunkMode::Pages)
        .await
        .expect("pages");
    let sentences = extract::read_documents_from_pdf(&source, ChunkMode::Sentences)
        .await
        .expect("sentences");
    assert!(sentences.len() >= pages.len());
}

#[tokio::test]
async fn test_default_pdf_is_used_without_upload() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("principals_ethic_ai.pdf"));

    let config = ChatConfig::builder().default_pdf(path).build().unwrap();
    let loaded = load_documents(&config, None).await.expect("load");
    assert!(loaded.is_default);
    assert!(!loaded.documents.is_empty());
}

// ── Web fetch (network, no LLM) ──────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_reference_page() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP");
        return;
    }
    init_logging();
    let config = ChatConfig::default();
    let docs = fetch::fetch_documents(&config.reference_url, 30)
        .await
        .expect("fetch");
    assert_eq!(docs.len(), 1);
    assert!(docs[0].content.to_lowercase().contains("prompt"));
}

// ── Live chat (needs API keys) ───────────────────────────────────────────────

async fn live_question(backend: Backend) {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("principals_ethic_ai.pdf"));
    if let Some(var) = backend.api_key_var() {
        if !has_key(var) {
            println!("SKIP — {var} not set");
            return;
        }
    }

    let config = ChatConfig::builder()
        .backend(backend)
        .default_pdf(path)
        .reply_format(ReplyFormat::Markdown)
        .max_retries(2)
        .build()
        .unwrap();
    let loaded = load_documents(&config, None).await.expect("load");
    let engine = ChatEngine::new(config, loaded.documents)
        .expect("documents")
        .connect()
        .expect("provider");
    let mut session = ChatSession::new(&[backend]);

    let answer = engine
        .ask(&mut session, "List two principles from the document.")
        .await
        .expect("answer");

    assert!(!answer.raw.trim().is_empty());
    assert!(answer.content.starts_with("- "));
    assert_eq!(session.history().len(), 2);
    println!("--- {backend} ---\n{}", answer.content);
}

#[tokio::test]
async fn test_live_anthropic() {
    live_question(Backend::Anthropic).await;
}

#[tokio::test]
async fn test_live_openai() {
    live_question(Backend::OpenAi).await;
}
