//! Google Cloud Storage client
//!
//! Talks to the Cloud Storage JSON API over `reqwest`, authenticating with
//! OAuth2 access tokens obtained from a signed service-account JWT.

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::credentials::ServiceAccountKey;
use super::{build_public_url, ObjectStorage};
use crate::core::config::StorageConfig;
use crate::core::error::{AppError, Result};

const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Error bodies are cut to this many characters before they reach users
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Claims of the JWT assertion exchanged for an access token
#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Response from the OAuth2 token endpoint
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Cached token with expiration tracking
struct TokenCache {
    token: TokenResponse,
    fetched_at: Instant,
}

/// Cloud Storage client bound to a single bucket
pub struct GcsClient {
    bucket: String,
    api_endpoint: String,
    public_endpoint: String,
    credentials: ServiceAccountKey,
    http_client: Client,
    cache: Arc<RwLock<Option<TokenCache>>>,
    /// Refresh token this many seconds before expiration
    refresh_margin: Duration,
}

impl GcsClient {
    pub fn new(config: &StorageConfig, credentials: ServiceAccountKey) -> Result<Self> {
        let http_client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "GCS client initialized for bucket: {}, service account: {}",
            config.bucket, credentials.client_email
        );

        Ok(Self {
            bucket: config.bucket.clone(),
            api_endpoint: config.api_endpoint.clone(),
            public_endpoint: config.public_endpoint.clone(),
            credentials,
            http_client,
            cache: Arc::new(RwLock::new(None)),
            refresh_margin: Duration::from_secs(60),
        })
    }

    /// Get a valid access token, fetching a new one if necessary
    async fn access_token(&self) -> Result<String> {
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                let elapsed = cached.fetched_at.elapsed();
                let expires_in = Duration::from_secs(cached.token.expires_in);

                if elapsed + self.refresh_margin < expires_in {
                    return Ok(cached.token.access_token.clone());
                }
            }
        }

        self.fetch_token().await
    }

    async fn fetch_token(&self) -> Result<String> {
        debug!("Fetching new GCS access token from {}", self.credentials.token_uri);

        let assertion = self.sign_assertion(Utc::now().timestamp())?;

        let response = self
            .http_client
            .post(&self.credentials.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to request access token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = truncate_body(&response.text().await.unwrap_or_default());
            return Err(AppError::Storage(format!(
                "Token request failed: HTTP {} - {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to parse token response: {}", e)))?;

        debug!("Fetched GCS access token, expires in {} seconds", token.expires_in);

        let access_token = token.access_token.clone();
        let mut cache = self.cache.write().await;
        *cache = Some(TokenCache {
            token,
            fetched_at: Instant::now(),
        });

        Ok(access_token)
    }

    /// Build the RS256-signed assertion for the token exchange
    fn sign_assertion(&self, now: i64) -> Result<String> {
        let claims = assertion_claims(&self.credentials, now);
        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| AppError::Config(format!("Invalid service-account private key: {}", e)))?;

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| AppError::Config(format!("Failed to sign token assertion: {}", e)))
    }

    fn upload_url(&self, key: &str) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.api_endpoint,
            self.bucket,
            urlencoding::encode(key)
        )
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.api_endpoint,
            self.bucket,
            urlencoding::encode(key)
        )
    }
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}

fn assertion_claims(credentials: &ServiceAccountKey, now: i64) -> AssertionClaims<'_> {
    AssertionClaims {
        iss: &credentials.client_email,
        scope: STORAGE_SCOPE,
        aud: &credentials.token_uri,
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    }
}

#[async_trait]
impl ObjectStorage for GcsClient {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String> {
        let token = self.access_token().await?;
        let size = data.len();

        let response = self
            .http_client
            .post(self.upload_url(key))
            .bearer_auth(token)
            .header("Content-Type", content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload '{}': {}", key, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = truncate_body(&response.text().await.unwrap_or_default());
            return Err(AppError::Storage(format!(
                "Failed to upload '{}': HTTP {} - {}",
                key, status, body
            )));
        }

        debug!("Uploaded '{}' ({} bytes) to bucket '{}'", key, size, self.bucket);
        Ok(self.public_url(key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let token = self.access_token().await?;

        let response = self
            .http_client
            .delete(self.object_url(key))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete '{}': {}", key, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = truncate_body(&response.text().await.unwrap_or_default());
            return Err(AppError::Storage(format!(
                "Failed to delete '{}': HTTP {} - {}",
                key, status, body
            )));
        }

        debug!("Deleted '{}' from bucket '{}'", key, self.bucket);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        build_public_url(&self.public_endpoint, &self.bucket, key)
    }

    fn bucket_name(&self) -> &str {
        &self.bucket
    }
}
