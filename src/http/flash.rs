//! Flash messages carried across a redirect in a signed cookie
//!
//! Cookie value: `base64url(json) "." base64url(hmac_sha256(secret, json))`.
//! A value whose signature does not verify is treated as absent.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use hyper::header::{HeaderMap, COOKIE};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub category: FlashCategory,
    pub message: String,
    /// Output file offered for download alongside the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<String>,
}

impl FlashMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Success,
            message: message.into(),
            download: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Error,
            message: message.into(),
            download: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Info,
            message: message.into(),
            download: None,
        }
    }

    #[must_use]
    pub fn with_download(mut self, file_name: impl Into<String>) -> Self {
        self.download = Some(file_name.into());
        self
    }
}

/// Signs and verifies the flash cookie
#[derive(Clone)]
pub struct FlashSigner {
    key: Vec<u8>,
    cookie_name: String,
}

impl std::fmt::Debug for FlashSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashSigner")
            .field("cookie_name", &self.cookie_name)
            .finish_non_exhaustive()
    }
}

impl FlashSigner {
    pub fn new(secret_key: &str, cookie_name: impl Into<String>) -> Self {
        Self {
            key: secret_key.as_bytes().to_vec(),
            cookie_name: cookie_name.into(),
        }
    }

    fn mac(&self) -> Option<HmacSha256> {
        HmacSha256::new_from_slice(&self.key).ok()
    }

    /// Serialize and sign messages into a cookie value
    pub fn encode(&self, messages: &[FlashMessage]) -> Option<String> {
        let payload = serde_json::to_vec(messages).ok()?;
        let mut mac = self.mac()?;
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();
        Some(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Verify and deserialize a cookie value
    pub fn decode(&self, value: &str) -> Option<Vec<FlashMessage>> {
        let (payload_b64, signature_b64) = value.split_once('.')?;
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
        let signature = URL_SAFE_NO_PAD.decode(signature_b64).ok()?;
        let mut mac = self.mac()?;
        mac.update(&payload);
        mac.verify_slice(&signature).ok()?;
        serde_json::from_slice(&payload).ok()
    }

    /// `Set-Cookie` value carrying `messages`
    pub fn set_cookie(&self, messages: &[FlashMessage]) -> Option<String> {
        let value = self.encode(messages)?;
        Some(format!(
            "{}={value}; Path=/; HttpOnly; SameSite=Lax",
            self.cookie_name
        ))
    }

    /// `Set-Cookie` value that deletes the flash cookie
    pub fn clear_cookie(&self) -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            self.cookie_name
        )
    }

    /// Messages from the request's `Cookie` headers; empty when absent or
    /// tampered with
    pub fn read(&self, headers: &HeaderMap) -> Vec<FlashMessage> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .and_then(|(_, value)| self.decode(value))
            .unwrap_or_default()
    }
}
