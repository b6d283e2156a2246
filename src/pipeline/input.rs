//! Input resolution: turn a user-supplied path or URL into PDF bytes.
//!
//! pdfium can open a document straight from memory, so unlike a file-based
//! pipeline nothing is written to disk: local files are read, URLs are
//! downloaded, and both are checked for the `%PDF` magic before the bytes
//! are handed to the extractor.

use crate::config::ChatConfig;
use crate::error::ChatError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Raw PDF bytes plus a human-readable name for messages.
#[derive(Debug, Clone)]
pub struct PdfSource {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Whether the PDF is the configured default rather than a user upload.
    pub is_default: bool,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a local path or HTTP(S) URL to PDF bytes.
pub async fn load_pdf(input: &str, timeout_secs: u64) -> Result<PdfSource, ChatError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ChatError::InvalidInput {
            input: input.to_string(),
            reason: "empty PDF path".into(),
        });
    }
    if is_url(input) {
        download_pdf(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

/// Pick the PDF for this session.
///
/// An explicit upload always wins. Without one the configured default PDF is
/// used; if that is missing too the session cannot start.
pub async fn resolve_pdf(
    config: &ChatConfig,
    upload: Option<&str>,
    timeout_secs: u64,
) -> Result<PdfSource, ChatError> {
    if let Some(upload) = upload {
        return load_pdf(upload, timeout_secs).await;
    }

    if !tokio::fs::try_exists(&config.default_pdf)
        .await
        .unwrap_or(false)
    {
        return Err(ChatError::DefaultPdfMissing {
            path: config.default_pdf.clone(),
        });
    }

    let mut source = read_local(&config.default_pdf).await?;
    source.is_default = true;
    Ok(source)
}

/// Copy the default PDF to `dest` so the user can keep a copy of it.
pub async fn export_default_pdf(config: &ChatConfig, dest: &Path) -> Result<u64, ChatError> {
    if !tokio::fs::try_exists(&config.default_pdf)
        .await
        .unwrap_or(false)
    {
        return Err(ChatError::DefaultPdfMissing {
            path: config.default_pdf.clone(),
        });
    }
    let copied = tokio::fs::copy(&config.default_pdf, dest)
        .await
        .map_err(|e| ChatError::Internal(format!("copy to {}: {e}", dest.display())))?;
    info!("Copied default PDF to {}", dest.display());
    Ok(copied)
}

/// Check the `%PDF` magic bytes.
pub fn validate_magic(name: &str, bytes: &[u8]) -> Result<(), ChatError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(ChatError::NotAPdf {
            source_name: name.to_string(),
            magic,
        });
    }
    Ok(())
}

async fn read_local(path: &Path) -> Result<PdfSource, ChatError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ChatError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ChatError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let name = path.display().to_string();
    validate_magic(&name, &bytes)?;

    debug!("Read local PDF: {} ({} bytes)", name, bytes.len());
    Ok(PdfSource {
        name,
        bytes,
        is_default: false,
    })
}

async fn download_pdf(url: &str, timeout_secs: u64) -> Result<PdfSource, ChatError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
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

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ChatError::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    let name = file_name_from_url(url);
    validate_magic(&name, &bytes)?;

    info!("Downloaded {} ({} bytes)", name, bytes.len());
    Ok(PdfSource {
        name,
        bytes,
        is_default: false,
    })
}

/// Last path segment of a URL if it looks like a file name, else `downloaded.pdf`.
fn file_name_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    "downloaded.pdf".to_string()
}

/// Absolute location of the default PDF, for messages.
pub fn default_pdf_display(config: &ChatConfig) -> PathBuf {
    std::env::current_dir()
        .map(|cwd| cwd.join(&config.default_pdf))
        .unwrap_or_else(|_| config.default_pdf.clone())
}
