//! Turn per-page text into prompt documents.
//!
//! Sentence boundaries come from Unicode text segmentation (UAX #29), which
//! handles abbreviations and quotes far better than splitting on `.`.

use crate::config::ChunkMode;
use crate::output::{Document, DocumentSource};
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Collapse runs of whitespace (including PDF line breaks) into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Split text into sentences, dropping fragments that are only whitespace.
pub fn split_sentences(text: &str) -> Vec<String> {
    let flat = collapse_whitespace(text);
    flat.split_sentence_bounds()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build documents from `(page_number, text)` pairs.
///
/// Pages whose text is blank are skipped in both modes; page numbers are kept
/// so the source of every document stays traceable.
pub fn chunk_pages(pages: &[(usize, String)], mode: ChunkMode) -> Vec<Document> {
    let mut documents = Vec::new();
    for (page, text) in pages {
        if text.trim().is_empty() {
            continue;
        }
        match mode {
            ChunkMode::Pages => {
                documents.push(Document::new(text.clone(), DocumentSource::Page(*page)));
            }
            ChunkMode::Sentences => {
                documents.extend(split_sentences(text).into_iter().enumerate().map(
                    |(i, sentence)| {
                        Document::new(
                            sentence,
                            DocumentSource::Sentence {
                                page: *page,
                                index: i + 1,
                            },
                        )
                    },
                ));
            }
        }
    }
    documents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_sentence_boundaries() {
        let s = split_sentences("AI must be fair. It must be transparent! Is it safe?");
        assert_eq!(
            s,
            vec!["AI must be fair.", "It must be transparent!", "Is it safe?"]
        );
    }

    #[test]
    fn joins_pdf_line_breaks_before_splitting() {
        let s = split_sentences("Principles of\nethical AI.\n\nSecond   one.");
        assert_eq!(s, vec!["Principles of ethical AI.", "Second one."]);
    }

    #[test]
    fn blank_text_has_no_sentences() {
        assert!(split_sentences(" \n\t ").is_empty());
    }

    #[test]
    fn page_mode_skips_blank_pages() {
        let pages = vec![
            (1, "First page".to_string()),
            (2, "   \n".to_string()),
            (3, "Third page".to_string()),
        ];
        let docs = chunk_pages(&pages, ChunkMode::Pages);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].source, DocumentSource::Page(1));
        assert_eq!(docs[1].source, DocumentSource::Page(3));
        assert_eq!(docs[1].content, "Third page");
    }

    #[test]
    fn sentence_mode_numbers_sentences_per_page() {
        let pages = vec![
            (1, "One. Two.".to_string()),
            (2, "Three.".to_string()),
        ];
        let docs = chunk_pages(&pages, ChunkMode::Sentences);
        let sources: Vec<_> = docs.iter().map(|d| d.source.clone()).collect();
        assert_eq!(
            sources,
            vec![
                DocumentSource::Sentence { page: 1, index: 1 },
                DocumentSource::Sentence { page: 1, index: 2 },
                DocumentSource::Sentence { page: 2, index: 1 },
            ]
        );
    }
}
