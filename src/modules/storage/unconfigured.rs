use async_trait::async_trait;
use axum::body::Bytes;

use super::{build_public_url, ObjectStorage};
use crate::core::error::{AppError, Result};

/// Stand-in used when the service-account credentials could not be loaded.
///
/// The server still starts and lists files; every upload or delete reports
/// the credential problem instead.
pub struct UnconfiguredStorage {
    bucket: String,
    public_endpoint: String,
    reason: String,
}

impl UnconfiguredStorage {
    pub fn new(bucket: String, public_endpoint: String, reason: String) -> Self {
        Self {
            bucket,
            public_endpoint,
            reason,
        }
    }
}

#[async_trait]
impl ObjectStorage for UnconfiguredStorage {
    async fn put(&self, _key: &str, _data: Bytes, _content_type: &str) -> Result<String> {
        Err(AppError::Config(self.reason.clone()))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(AppError::Config(self.reason.clone()))
    }

    fn public_url(&self, key: &str) -> String {
        build_public_url(&self.public_endpoint, &self.bucket, key)
    }

    fn bucket_name(&self) -> &str {
        &self.bucket
    }
}
