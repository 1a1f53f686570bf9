//! Storage module for uploaded PDFs
//!
//! Provides the object-storage seam used by the file service, a Google
//! Cloud Storage client behind it, and the service-account credential
//! loader that authenticates that client.

mod credentials;
mod gcs_client;
mod unconfigured;

use async_trait::async_trait;
use axum::body::Bytes;

use crate::core::error::Result;

pub use credentials::load_credentials;
pub use gcs_client::GcsClient;
pub use unconfigured::UnconfiguredStorage;

/// Key-addressed blob storage
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload `data` under `key`, overwriting any existing object.
    ///
    /// Returns the public URL of the stored object.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String>;

    /// Delete the object stored under `key`. A missing object is an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Public URL for `key`, built without contacting the service
    fn public_url(&self, key: &str) -> String;

    fn bucket_name(&self) -> &str;
}

/// `{endpoint}/{bucket}/{key}` by plain concatenation
pub(crate) fn build_public_url(endpoint: &str, bucket: &str, key: &str) -> String {
    format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key)
}
