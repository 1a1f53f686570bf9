use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::files::models::{NewPdfFile, PdfFile};

/// Metadata store for uploaded PDFs
#[async_trait]
pub trait PdfFileRepository: Send + Sync {
    /// Newest first; with `search`, only rows whose text matches it
    async fn list(&self, search: Option<&str>) -> Result<Vec<PdfFile>>;

    async fn insert(&self, file: NewPdfFile) -> Result<PdfFile>;

    /// Remove the rows for `storage_keys` in a single transaction.
    ///
    /// Keys without a row are skipped. Returns the number of rows removed.
    async fn delete_by_storage_keys(&self, storage_keys: &[String]) -> Result<u64>;
}

/// Postgres-backed repository
pub struct PgPdfFileRepository {
    pool: PgPool,
}

impl PgPdfFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PdfFileRepository for PgPdfFileRepository {
    async fn list(&self, search: Option<&str>) -> Result<Vec<PdfFile>> {
        let files = match search {
            Some(term) => {
                sqlx::query_as::<_, PdfFile>(
                    r#"
                    SELECT id, original_name, storage_key, storage_url, extracted_text, uploaded_at
                    FROM pdf_files
                    WHERE to_tsvector('simple', COALESCE(extracted_text, ''))
                          @@ plainto_tsquery('simple', $1)
                    ORDER BY uploaded_at DESC, id DESC
                    "#,
                )
                .bind(term)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, PdfFile>(
                    r#"
                    SELECT id, original_name, storage_key, storage_url, extracted_text, uploaded_at
                    FROM pdf_files
                    ORDER BY uploaded_at DESC, id DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| {
            tracing::error!("Failed to list pdf files: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(files)
    }

    async fn insert(&self, file: NewPdfFile) -> Result<PdfFile> {
        let file = sqlx::query_as::<_, PdfFile>(
            r#"
            INSERT INTO pdf_files (original_name, storage_key, storage_url, extracted_text)
            VALUES ($1, $2, $3, $4)
            RETURNING id, original_name, storage_key, storage_url, extracted_text, uploaded_at
            "#,
        )
        .bind(&file.original_name)
        .bind(&file.storage_key)
        .bind(&file.storage_url)
        .bind(&file.extracted_text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert pdf file {}: {:?}", file.storage_key, e);
            AppError::Database(e)
        })?;

        Ok(file)
    }

    async fn delete_by_storage_keys(&self, storage_keys: &[String]) -> Result<u64> {
        // Dropping the transaction on an early return rolls it back
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;

        for key in storage_keys {
            let result = sqlx::query("DELETE FROM pdf_files WHERE storage_key = $1")
                .bind(key)
                .execute(&mut *tx)
                .await?;
            removed += result.rows_affected();
        }

        tx.commit().await?;
        Ok(removed)
    }
}
