use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for an uploaded PDF
#[derive(Debug, Clone, FromRow)]
pub struct PdfFile {
    pub id: i32,
    /// Filename exactly as the browser sent it
    pub original_name: String,
    pub storage_key: String,
    pub storage_url: String,
    /// Page text, or the extraction sentinel
    pub extracted_text: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl PdfFile {
    /// Name shown in the listing: everything after the first `_`, if any
    pub fn display_name(&self) -> &str {
        display_name(&self.original_name)
    }
}

pub(crate) fn display_name(original_name: &str) -> &str {
    original_name
        .split_once('_')
        .map(|(_, rest)| rest)
        .unwrap_or(original_name)
}

/// Values for inserting a new row; `id` and `uploaded_at` come from the database
#[derive(Debug, Clone)]
pub struct NewPdfFile {
    pub original_name: String,
    pub storage_key: String,
    pub storage_url: String,
    pub extracted_text: Option<String>,
}
