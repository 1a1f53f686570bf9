//! One-shot messages carried across a redirect in a cookie

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::prelude::*;
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

impl FlashMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}

/// base64url(JSON), safe to use as a cookie value
pub fn encode(messages: &[FlashMessage]) -> String {
    let json = serde_json::to_vec(messages).unwrap_or_default();
    BASE64_URL_SAFE_NO_PAD.encode(json)
}

/// Inverse of [`encode`]; anything undecodable yields no messages
pub fn decode(value: &str) -> Vec<FlashMessage> {
    BASE64_URL_SAFE_NO_PAD
        .decode(value)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

/// Queue a message for the next page render
pub fn push(jar: CookieJar, message: FlashMessage) -> CookieJar {
    let mut messages = jar
        .get(FLASH_COOKIE)
        .map(|c| decode(c.value()))
        .unwrap_or_default();
    messages.push(message);

    let cookie = Cookie::build((FLASH_COOKIE, encode(&messages)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    jar.add(cookie)
}

/// Drain queued messages, clearing the cookie if one was set
pub fn take(jar: CookieJar) -> (CookieJar, Vec<FlashMessage>) {
    match jar.get(FLASH_COOKIE).map(|c| decode(c.value())) {
        Some(messages) => {
            let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
            (jar, messages)
        }
        None => (jar, Vec::new()),
    }
}
