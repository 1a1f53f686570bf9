//! Text extraction for uploaded documents

mod pdf_extractor;

use axum::body::Bytes;
use std::sync::Arc;

use crate::core::error::Result;

pub use pdf_extractor::PdfTextExtractor;

/// Stored in place of the text when extraction fails
pub const EXTRACTION_FAILED_TEXT: &str = "parsing failed";

/// Turns a document's bytes into plain text
pub trait TextExtractor: Send + Sync + 'static {
    fn extract_text(&self, data: &[u8]) -> Result<String>;
}

/// Run `extractor` on the blocking pool and never fail.
///
/// Any error, including a panic inside the parser, yields
/// [`EXTRACTION_FAILED_TEXT`].
pub async fn extract_or_sentinel(extractor: Arc<dyn TextExtractor>, data: Bytes) -> String {
    match tokio::task::spawn_blocking(move || extractor.extract_text(&data)).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            tracing::warn!("Text extraction failed, storing sentinel: {}", e);
            EXTRACTION_FAILED_TEXT.to_string()
        }
        Err(e) => {
            tracing::warn!("Text extraction task aborted, storing sentinel: {}", e);
            EXTRACTION_FAILED_TEXT.to_string()
        }
    }
}
