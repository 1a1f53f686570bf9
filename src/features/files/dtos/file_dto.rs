use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::files::models::PdfFile;

/// Multipart field carrying the uploaded PDF
pub const UPLOAD_FIELD: &str = "pdfFile";

/// Content type recorded on every stored object
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Longest filename the metadata table accepts
pub const MAX_ORIGINAL_NAME_LEN: usize = 500;

/// Multipart framing allowance on top of the file size limit
pub const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Query parameters for listing and searching files
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Free-text search over the extracted text
    pub query: Option<String>,
}

impl SearchQuery {
    /// The trimmed search term; blank or missing means no search
    pub fn term(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// Form posted by the delete button
#[derive(Debug, Default, Deserialize, Validate)]
pub struct DeleteFilesForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "No files selected for deletion."))]
    pub selected_files: Vec<String>,
}

/// A stored PDF as shown in listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileResponseDto {
    pub id: i32,
    /// Original name with everything up to the first `_` removed
    pub display_name: String,
    /// Filename as uploaded
    pub original_name: String,
    /// Object key, also used to select the file for deletion
    pub storage_key: String,
    /// Public URL of the stored object
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<PdfFile> for FileResponseDto {
    fn from(file: PdfFile) -> Self {
        Self {
            id: file.id,
            display_name: file.display_name().to_string(),
            storage_key: file.storage_key,
            url: file.storage_url,
            uploaded_at: file.uploaded_at,
            original_name: file.original_name,
        }
    }
}

/// Case-insensitive check of the text after the last dot
pub fn is_pdf_filename(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("pdf"))
}

/// Object key layout: `pdf/<YYYYMMDD>/<hex id>-<original filename>`
pub fn build_storage_key(date: NaiveDate, id: Uuid, original_name: &str) -> String {
    format!(
        "pdf/{}/{}-{}",
        date.format("%Y%m%d"),
        id.simple(),
        original_name
    )
}
