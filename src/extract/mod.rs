// Text extraction
// Turns a supported file into plain text; failures degrade to empty text

#[cfg(test)]
mod tests;

use anyhow::{Context, Result, anyhow};
use std::path::Path;
use tracing::{debug, warn};

/// File extensions accepted for ingestion, lowercase and without the dot
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["txt", "md", "pdf"];

/// Document formats the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Markdown,
    Pdf,
}

impl DocumentKind {
    /// Classify a path by its extension, ignoring case
    #[inline]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "txt" => Some(Self::Text),
            "md" => Some(Self::Markdown),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Extract plain text from `path`.
///
/// Returns `None` for unsupported file types, which callers treat as a skip.
/// Unreadable or unparseable files yield `Some` with an empty string so that
/// one bad file never aborts a batch.
#[inline]
pub async fn extract_text(path: &Path) -> Option<String> {
    let Some(kind) = DocumentKind::from_path(path) else {
        debug!("Skipping unsupported file: {}", path.display());
        return None;
    };

    let result = match kind {
        DocumentKind::Text | DocumentKind::Markdown => read_text_lossy(path).await,
        DocumentKind::Pdf => read_pdf_pages(path).await,
    };

    match result {
        Ok(text) => {
            debug!(
                "Extracted {} characters from {}",
                text.chars().count(),
                path.display()
            );
            Some(text)
        }
        Err(e) => {
            warn!("Failed to extract text from {}: {:#}", path.display(), e);
            Some(String::new())
        }
    }
}

async fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(decode_utf8_ignoring_errors(&bytes))
}

/// Decode UTF-8, dropping byte sequences that are not valid
fn decode_utf8_ignoring_errors(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

async fn read_pdf_pages(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    // The parser can panic on malformed input; the join error contains it
    let pages =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&bytes))
            .await
            .context("PDF parser panicked")?
            .map_err(|e| anyhow!("Failed to parse PDF: {}", e))?;

    Ok(pages.join("\n"))
}
