use lopdf::Document;

use super::TextExtractor;
use crate::core::error::{AppError, Result};

/// Extracts the text of every page with lopdf, concatenated in page order
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, data: &[u8]) -> Result<String> {
        let doc = Document::load_mem(data)
            .map_err(|e| AppError::Parse(format!("Failed to load PDF: {}", e)))?;

        let mut text = String::new();
        // get_pages is keyed by page number, so iteration is in page order
        for page_num in doc.get_pages().keys() {
            let page_text = doc.extract_text(&[*page_num]).map_err(|e| {
                AppError::Parse(format!("Failed to extract page {}: {}", page_num, e))
            })?;
            text.push_str(&page_text);
        }

        Ok(text)
    }
}
