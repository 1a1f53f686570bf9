use axum::body::Bytes;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::files::dtos::{
    build_storage_key, is_pdf_filename, FileResponseDto, MAX_ORIGINAL_NAME_LEN, PDF_CONTENT_TYPE,
};
use crate::features::files::models::{NewPdfFile, PdfFile};
use crate::features::files::repositories::PdfFileRepository;
use crate::modules::extraction::{extract_or_sentinel, TextExtractor};
use crate::modules::storage::ObjectStorage;

/// Upload, listing and deletion of stored PDFs
pub struct FileService {
    repository: Arc<dyn PdfFileRepository>,
    storage: Arc<dyn ObjectStorage>,
    extractor: Arc<dyn TextExtractor>,
    max_upload_size: usize,
}

impl FileService {
    pub fn new(
        repository: Arc<dyn PdfFileRepository>,
        storage: Arc<dyn ObjectStorage>,
        extractor: Arc<dyn TextExtractor>,
        max_upload_size: usize,
    ) -> Self {
        Self {
            repository,
            storage,
            extractor,
            max_upload_size,
        }
    }

    pub fn max_upload_size(&self) -> usize {
        self.max_upload_size
    }

    /// List stored files newest first, optionally filtered by a full-text search.
    ///
    /// `search` is used as given; callers decide what counts as a search.
    pub async fn list_files(&self, search: Option<&str>) -> Result<Vec<FileResponseDto>> {
        let files = self.repository.list(search).await?;

        debug!("Listed {} files (search: {:?})", files.len(), search);
        Ok(files.into_iter().map(Into::into).collect())
    }

    /// Check an upload before anything is extracted or stored
    pub fn validate_upload(&self, original_name: &str, size: usize) -> Result<()> {
        if original_name.is_empty() {
            return Err(AppError::Validation("No file selected.".to_string()));
        }

        if !is_pdf_filename(original_name) {
            return Err(AppError::Validation(
                "Only PDF files can be uploaded.".to_string(),
            ));
        }

        if original_name.chars().count() > MAX_ORIGINAL_NAME_LEN {
            return Err(AppError::Validation(format!(
                "Filename is too long (max {} characters).",
                MAX_ORIGINAL_NAME_LEN
            )));
        }

        if size > self.max_upload_size {
            return Err(AppError::Validation(format!(
                "File too large. Maximum size is {} MB.",
                self.max_upload_size / 1024 / 1024
            )));
        }

        Ok(())
    }

    /// Extract the text of a PDF, store the file and record its metadata.
    ///
    /// A failed extraction is stored as the sentinel text and does not stop
    /// the upload. If the metadata insert fails after the object was stored,
    /// the object is left in the bucket.
    pub async fn upload_pdf(&self, original_name: &str, data: Bytes) -> Result<PdfFile> {
        self.validate_upload(original_name, data.len())?;

        let extracted_text =
            extract_or_sentinel(Arc::clone(&self.extractor), data.clone()).await;

        let storage_key = build_storage_key(Utc::now().date_naive(), Uuid::new_v4(), original_name);
        let storage_url = self
            .storage
            .put(&storage_key, data, PDF_CONTENT_TYPE)
            .await?;

        debug!("Stored object '{}' in bucket '{}'", storage_key, self.storage.bucket_name());

        let file = self
            .repository
            .insert(NewPdfFile {
                original_name: original_name.to_string(),
                storage_key: storage_key.clone(),
                storage_url,
                extracted_text: Some(extracted_text),
            })
            .await
            .inspect_err(|e| {
                warn!(
                    "Metadata insert failed, object '{}' left without a record: {}",
                    storage_key, e
                );
            })?;

        info!(
            "File uploaded: id={}, key={}, name={}",
            file.id, file.storage_key, file.original_name
        );

        Ok(file)
    }

    /// Delete each object from storage in order, then remove their rows together.
    ///
    /// The first storage failure aborts the whole operation before any row is
    /// removed; objects deleted before it stay deleted. Returns the number of
    /// keys processed.
    pub async fn delete_files(&self, storage_keys: &[String]) -> Result<usize> {
        if storage_keys.is_empty() {
            return Err(AppError::Validation(
                "No files selected for deletion.".to_string(),
            ));
        }

        for key in storage_keys {
            self.storage.delete(key).await?;
            debug!("Deleted object '{}'", key);
        }

        let removed = self
            .repository
            .delete_by_storage_keys(storage_keys)
            .await?;

        info!(
            "Deleted {} objects and {} metadata rows",
            storage_keys.len(),
            removed
        );

        Ok(storage_keys.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::extraction::EXTRACTION_FAILED_TEXT;
    use crate::shared::test_helpers::{
        FailingExtractor, FixedTextExtractor, InMemoryPdfFileRepository, InMemoryStorage,
        TestContext,
    };
    use fake::faker::lorem::en::Words;
    use fake::Fake;

    const PDF_BYTES: &[u8] = b"%PDF-1.4 fake body";

    #[tokio::test]
    async fn test_upload_stores_object_and_record() {
        let ctx = TestContext::new(FixedTextExtractor::new("quarterly revenue report"));

        let file = ctx
            .service
            .upload_pdf("2024_report.pdf", Bytes::from_static(PDF_BYTES))
            .await
            .unwrap();

        assert!(file.storage_key.starts_with("pdf/"));
        assert!(file.storage_key.ends_with("-2024_report.pdf"));
        assert_eq!(file.original_name, "2024_report.pdf");
        assert_eq!(file.extracted_text.as_deref(), Some("quarterly revenue report"));
        assert_eq!(file.storage_url, ctx.storage.public_url(&file.storage_key));

        let stored = ctx.storage.object(&file.storage_key).expect("object stored");
        assert_eq!(stored.0.as_ref(), PDF_BYTES);
        assert_eq!(stored.1, PDF_CONTENT_TYPE);
        assert_eq!(ctx.repository.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_keys_are_unique_for_same_name() {
        let ctx = TestContext::new(FixedTextExtractor::new("text"));
        let a = ctx
            .service
            .upload_pdf("same.pdf", Bytes::from_static(PDF_BYTES))
            .await
            .unwrap();
        let b = ctx
            .service
            .upload_pdf("same.pdf", Bytes::from_static(PDF_BYTES))
            .await
            .unwrap();
        assert_ne!(a.storage_key, b.storage_key);
        assert_eq!(ctx.storage.object_count(), 2);
    }

    #[tokio::test]
    async fn test_upload_with_failed_extraction_still_stores() {
        let ctx = TestContext::new(FailingExtractor);

        let file = ctx
            .service
            .upload_pdf("broken.pdf", Bytes::from_static(b"not a pdf"))
            .await
            .unwrap();

        assert_eq!(file.extracted_text.as_deref(), Some(EXTRACTION_FAILED_TEXT));
        assert!(ctx.storage.object(&file.storage_key).is_some());
        assert_eq!(ctx.repository.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf_without_side_effects() {
        let ctx = TestContext::new(FixedTextExtractor::new("text"));

        for name in ["notes.txt", "letter.docx", "README", ""] {
            let result = ctx
                .service
                .upload_pdf(name, Bytes::from_static(PDF_BYTES))
                .await;
            assert!(matches!(result, Err(AppError::Validation(_))), "{name}");
        }

        assert_eq!(ctx.storage.object_count(), 0);
        assert!(ctx.repository.rows().is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_overlong_name_and_oversized_file() {
        let ctx = TestContext::with_max_upload_size(FixedTextExtractor::new("text"), 8);

        let long_name = format!("{}.pdf", "a".repeat(MAX_ORIGINAL_NAME_LEN));
        let result = ctx
            .service
            .upload_pdf(&long_name, Bytes::from_static(b"%PDF"))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let result = ctx
            .service
            .upload_pdf("big.pdf", Bytes::from_static(PDF_BYTES))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(ctx.storage.object_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_storage_failure_creates_no_record() {
        let ctx = TestContext::new(FixedTextExtractor::new("text"));
        ctx.storage.fail_puts(true);

        let result = ctx
            .service
            .upload_pdf("report.pdf", Bytes::from_static(PDF_BYTES))
            .await;

        assert!(matches!(result, Err(AppError::Storage(_))));
        assert!(ctx.repository.rows().is_empty());
    }

    #[tokio::test]
    async fn test_upload_database_failure_leaves_object() {
        let ctx = TestContext::new(FixedTextExtractor::new("text"));
        ctx.repository.set_failing(true);

        let result = ctx
            .service
            .upload_pdf("report.pdf", Bytes::from_static(PDF_BYTES))
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(ctx.storage.object_count(), 1);
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_repeatable() {
        let ctx = TestContext::new(FixedTextExtractor::new("text"));
        ctx.repository.seed("1_first.pdf", Some("alpha"));
        ctx.repository.seed("2_second.pdf", Some("beta"));
        ctx.repository.seed("third.pdf", None);

        let first = ctx.service.list_files(None).await.unwrap();
        let names: Vec<_> = first.iter().map(|f| f.display_name.as_str()).collect();
        assert_eq!(names, ["third.pdf", "second.pdf", "first.pdf"]);

        let second = ctx.service.list_files(None).await.unwrap();
        let ids = |v: &[FileResponseDto]| v.iter().map(|f| f.id).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[tokio::test]
    async fn test_search_matches_extracted_text() {
        let ctx = TestContext::new(FixedTextExtractor::new("text"));
        let words: Vec<String> = Words(3..6).fake();
        ctx.repository.seed("invoice.pdf", Some("Invoice total due in March"));
        ctx.repository.seed("random.pdf", Some(&words.join(" ")));

        let hits = ctx.service.list_files(Some("invoice")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].original_name, "invoice.pdf");

        let misses = ctx.service.list_files(Some("zzzxqv")).await.unwrap();
        assert!(misses.is_empty());

        let all = ctx.service.list_files(None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_removes_object_and_row() {
        let ctx = TestContext::new(FixedTextExtractor::new("text"));
        let file = ctx
            .service
            .upload_pdf("report.pdf", Bytes::from_static(PDF_BYTES))
            .await
            .unwrap();

        let count = ctx
            .service
            .delete_files(&[file.storage_key.clone()])
            .await
            .unwrap();

        assert_eq!(count, 1);
        assert!(ctx.storage.object(&file.storage_key).is_none());
        assert!(ctx.repository.rows().is_empty());
    }

    #[tokio::test]
    async fn test_delete_empty_selection_is_validation_error() {
        let ctx = TestContext::new(FixedTextExtractor::new("text"));
        let result = ctx.service.delete_files(&[]).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_storage_failure_keeps_all_rows() {
        let ctx = TestContext::new(FixedTextExtractor::new("text"));
        let a = ctx
            .service
            .upload_pdf("a.pdf", Bytes::from_static(PDF_BYTES))
            .await
            .unwrap();
        let b = ctx
            .service
            .upload_pdf("b.pdf", Bytes::from_static(PDF_BYTES))
            .await
            .unwrap();

        let keys = vec![
            a.storage_key.clone(),
            "pdf/20240101/missing-object.pdf".to_string(),
            b.storage_key.clone(),
        ];
        let result = ctx.service.delete_files(&keys).await;

        assert!(matches!(result, Err(AppError::Storage(_))));
        // Processed before the failure: object gone, row kept
        assert!(ctx.storage.object(&a.storage_key).is_none());
        // After the failure: untouched
        assert!(ctx.storage.object(&b.storage_key).is_some());
        assert_eq!(ctx.repository.rows().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_database_failure_is_reported() {
        let repository = Arc::new(InMemoryPdfFileRepository::default());
        let storage = Arc::new(InMemoryStorage::default());
        let service = FileService::new(
            repository.clone(),
            storage.clone(),
            Arc::new(FixedTextExtractor::new("text")),
            1024,
        );
        let file = service
            .upload_pdf("a.pdf", Bytes::from_static(PDF_BYTES))
            .await
            .unwrap();
        repository.set_failing(true);

        let result = service.delete_files(&[file.storage_key.clone()]).await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(repository.rows().len(), 1);
    }
}
