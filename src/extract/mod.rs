//! Document text extraction.
//!
//! Ingestion consumes extracted text through the [`DocumentExtractor`] seam;
//! the shipped implementation handles plain-text and markdown files. Binary
//! formats (PDF, office documents) belong behind this trait as additional
//! implementations.

use std::path::Path;

use async_trait::async_trait;

use crate::core::errors::RagError;

/// One contiguous piece of extracted text, with its position in the source
/// document when the format provides one.
#[derive(Debug, Clone)]
pub struct TextSegment {
    pub text: String,
    /// 1-based page number, when the source format has pages.
    pub page: Option<usize>,
}

/// Pulls the text content out of a document on disk.
///
/// An unreadable or corrupt file must propagate as an error, never be
/// swallowed. Extraction yielding zero segments is legal here; the session
/// store decides whether that is reported to the user.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<Vec<TextSegment>, RagError>;
}

/// Extractor for UTF-8 text files (.txt, .md and friends).
///
/// Form feeds are treated as page breaks, matching how print-oriented text
/// exports mark pagination.
pub struct PlainTextExtractor;

#[async_trait]
impl DocumentExtractor for PlainTextExtractor {
    async fn extract(&self, path: &Path) -> Result<Vec<TextSegment>, RagError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| RagError::Ingestion(format!("cannot read {}: {}", path.display(), err)))?;

        if !raw.contains('\u{c}') {
            return Ok(vec![TextSegment {
                text: raw,
                page: None,
            }]);
        }

        Ok(raw
            .split('\u{c}')
            .enumerate()
            .map(|(idx, page_text)| TextSegment {
                text: page_text.to_string(),
                page: Some(idx + 1),
            })
            .collect())
    }
}
