//! Service-account credential loader
//!
//! The deployment passes the whole service-account key file as a JSON
//! string in `GOOGLE_APPLICATION_CREDENTIALS` rather than a path.

use serde::Deserialize;

use crate::core::error::{AppError, Result};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The parts of a service-account key file needed to mint access tokens
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// Parse the credential blob taken from the environment.
///
/// Fails with [`AppError::Config`] when the blob is absent, blank or not a
/// valid service-account JSON document.
pub fn load_credentials(raw: Option<&str>) -> Result<ServiceAccountKey> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AppError::Config(
                "GOOGLE_APPLICATION_CREDENTIALS environment variable is not set".to_string(),
            )
        })?;

    let key: ServiceAccountKey = serde_json::from_str(raw).map_err(|e| {
        AppError::Config(format!(
            "GOOGLE_APPLICATION_CREDENTIALS is not valid service-account JSON: {}",
            e
        ))
    })?;

    if key.client_email.is_empty() || key.private_key.is_empty() {
        return Err(AppError::Config(
            "GOOGLE_APPLICATION_CREDENTIALS is missing client_email or private_key".to_string(),
        ));
    }

    Ok(key)
}
