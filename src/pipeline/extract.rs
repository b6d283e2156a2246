//! PDF text extraction via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations.

use crate::config::ChunkMode;
use crate::error::ChatError;
use crate::output::{Document, PdfSummary};
use crate::pipeline::input::PdfSource;
use crate::pipeline::segment;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Extract prompt documents from a PDF held in memory.
///
/// One document per page with text (or per sentence, see [`ChunkMode`]);
/// pages whose text is blank are skipped.
pub async fn read_documents_from_pdf(
    source: &PdfSource,
    mode: ChunkMode,
) -> Result<Vec<Document>, ChatError> {
    let pages = page_texts(source).await?;
    let documents = segment::chunk_pages(&pages, mode);
    info!(
        "Extracted {} documents from {} pages of {}",
        documents.len(),
        pages.len(),
        source.name
    );
    Ok(documents)
}

/// Count pages and text-bearing pages without building documents.
pub async fn inspect(source: &PdfSource) -> Result<PdfSummary, ChatError> {
    let pages = page_texts(source).await?;
    Ok(PdfSummary {
        source_name: source.name.clone(),
        page_count: pages.len(),
        text_pages: pages.iter().filter(|(_, t)| !t.trim().is_empty()).count(),
        byte_len: source.bytes.len(),
    })
}

/// `(1-indexed page number, text)` for every page, in order.
pub async fn page_texts(source: &PdfSource) -> Result<Vec<(usize, String)>, ChatError> {
    let name = source.name.clone();
    let bytes = source.bytes.clone();

    tokio::task::spawn_blocking(move || page_texts_blocking(&name, bytes))
        .await
        .map_err(|e| ChatError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Blocking implementation of text extraction.
fn page_texts_blocking(name: &str, bytes: Vec<u8>) -> Result<Vec<(usize, String)>, ChatError> {
    let pdfium = pdfium_auto::bind_pdfium_silent()
        .map_err(|e| ChatError::PdfiumBindingFailed(e.to_string()))?;

    let document = pdfium
        .load_pdf_from_byte_vec(bytes, None)
        .map_err(|e| classify_load_error(name, &format!("{:?}", e)))?;

    let pages = document.pages();
    debug!("PDF {} opened: {} pages", name, pages.len());

    let mut texts = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| ChatError::CorruptPdf {
                source_name: name.to_string(),
                detail: format!("page {}: {:?}", idx + 1, e),
            })?
            .all();
        texts.push((idx + 1, text));
    }

    Ok(texts)
}

/// Map a pdfium load failure to the matching error variant.
fn classify_load_error(name: &str, detail: &str) -> ChatError {
    if detail.contains("Password") || detail.contains("password") {
        ChatError::PasswordRequired {
            source_name: name.to_string(),
        }
    } else {
        ChatError::CorruptPdf {
            source_name: name.to_string(),
            detail: detail.to_string(),
        }
    }
}
