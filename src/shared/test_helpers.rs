//! In-memory stand-ins for the database, bucket and PDF parser

use async_trait::async_trait;
use axum::body::Bytes;
use axum::Router;
use chrono::{Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::error::{AppError, Result};
use crate::features::files::models::{NewPdfFile, PdfFile};
use crate::features::files::repositories::PdfFileRepository;
use crate::features::files::{routes, FileService};
use crate::modules::extraction::TextExtractor;
use crate::modules::storage::ObjectStorage;

pub const TEST_BUCKET: &str = "test-bucket";
pub const TEST_PUBLIC_ENDPOINT: &str = "https://storage.googleapis.com";

/// Lowercased alphanumeric tokens, roughly what the `simple` text-search config produces
fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

#[derive(Default)]
pub struct InMemoryPdfFileRepository {
    rows: Mutex<Vec<PdfFile>>,
    next_id: AtomicI32,
    failing: AtomicBool,
}

impl InMemoryPdfFileRepository {
    pub fn rows(&self) -> Vec<PdfFile> {
        self.rows.lock().unwrap().clone()
    }

    /// Make every subsequent call fail like a lost connection
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Insert a row directly, each one a minute newer than the last
    pub fn seed(&self, original_name: &str, extracted_text: Option<&str>) -> PdfFile {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let file = PdfFile {
            id,
            original_name: original_name.to_string(),
            storage_key: format!("pdf/20240101/{:032x}-{}", id, original_name),
            storage_url: format!(
                "{}/{}/pdf/20240101/{:032x}-{}",
                TEST_PUBLIC_ENDPOINT, TEST_BUCKET, id, original_name
            ),
            extracted_text: extracted_text.map(str::to_string),
            uploaded_at: Utc::now() - Duration::days(1) + Duration::minutes(id as i64),
        };
        self.rows.lock().unwrap().push(file.clone());
        file
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(AppError::Database(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PdfFileRepository for InMemoryPdfFileRepository {
    async fn list(&self, search: Option<&str>) -> Result<Vec<PdfFile>> {
        self.check()?;
        let mut files: Vec<PdfFile> = self
            .rows()
            .into_iter()
            .filter(|file| match search {
                Some(term) => {
                    let wanted = tokens(term);
                    let have = tokens(file.extracted_text.as_deref().unwrap_or(""));
                    !wanted.is_empty() && wanted.is_subset(&have)
                }
                None => true,
            })
            .collect();
        files.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(files)
    }

    async fn insert(&self, file: NewPdfFile) -> Result<PdfFile> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.storage_key == file.storage_key) {
            return Err(AppError::Database(sqlx::Error::Protocol(
                "duplicate storage_key".to_string(),
            )));
        }
        let row = PdfFile {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            original_name: file.original_name,
            storage_key: file.storage_key,
            storage_url: file.storage_url,
            extracted_text: file.extracted_text,
            uploaded_at: Utc::now(),
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn delete_by_storage_keys(&self, storage_keys: &[String]) -> Result<u64> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| !storage_keys.contains(&r.storage_key));
        Ok((before - rows.len()) as u64)
    }
}

/// Bucket kept in a map: key -> (bytes, content type)
#[derive(Default)]
pub struct InMemoryStorage {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
    fail_puts: AtomicBool,
}

impl InMemoryStorage {
    pub fn object(&self, key: &str) -> Option<(Bytes, String)> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(AppError::Storage("bucket unavailable".to_string()));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(self.public_url(key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self.objects.lock().unwrap().remove(key) {
            Some(_) => Ok(()),
            None => Err(AppError::Storage(format!(
                "Failed to delete '{}': HTTP 404 Not Found",
                key
            ))),
        }
    }

    fn public_url(&self, key: &str) -> String {
        crate::modules::storage::build_public_url(TEST_PUBLIC_ENDPOINT, TEST_BUCKET, key)
    }

    fn bucket_name(&self) -> &str {
        TEST_BUCKET
    }
}

/// Extractor returning the same text for any input
pub struct FixedTextExtractor(String);

impl FixedTextExtractor {
    pub fn new(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl TextExtractor for FixedTextExtractor {
    fn extract_text(&self, _data: &[u8]) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Extractor that rejects every document
pub struct FailingExtractor;

impl TextExtractor for FailingExtractor {
    fn extract_text(&self, _data: &[u8]) -> Result<String> {
        Err(AppError::Parse("invalid PDF header".to_string()))
    }
}

/// A file service wired to fakes, with handles to inspect them
pub struct TestContext {
    pub repository: Arc<InMemoryPdfFileRepository>,
    pub storage: Arc<InMemoryStorage>,
    pub service: Arc<FileService>,
}

impl TestContext {
    pub fn new(extractor: impl TextExtractor) -> Self {
        Self::with_max_upload_size(extractor, 10 * 1024 * 1024)
    }

    pub fn with_max_upload_size(extractor: impl TextExtractor, max_upload_size: usize) -> Self {
        let repository = Arc::new(InMemoryPdfFileRepository::default());
        let storage = Arc::new(InMemoryStorage::default());
        let service = Arc::new(FileService::new(
            repository.clone(),
            storage.clone(),
            Arc::new(extractor),
            max_upload_size,
        ));
        Self {
            repository,
            storage,
            service,
        }
    }

    pub fn router(&self) -> Router {
        routes(Arc::clone(&self.service))
    }
}
