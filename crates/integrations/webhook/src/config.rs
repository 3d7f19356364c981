use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Authentication method for the webhook endpoint.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthMethod {
    /// HTTP Bearer token (`Authorization: Bearer <token>`).
    Bearer(String),

    /// HMAC signature of the request body, sent in a header.
    /// The signature is computed as `HMAC-SHA256(secret, body)` and
    /// hex-encoded.
    HmacSha256 { secret: String, header: String },
}

impl std::fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"[REDACTED]").finish(),
            Self::HmacSha256 { header, .. } => f
                .debug_struct("HmacSha256")
                .field("secret", &"[REDACTED]")
                .field("header", header)
                .finish(),
        }
    }
}

/// Configuration for the webhook notifier.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Target URL for event delivery.
    pub url: String,
    /// Optional authentication.
    pub auth: Option<AuthMethod>,
    /// Request timeout.
    pub timeout: Duration,
}

impl WebhookConfig {
    /// Unauthenticated delivery to `url` with a 10 second timeout.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth: None,
            timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secrets() {
        let auth = AuthMethod::Bearer("token-123".into());
        assert!(!format!("{auth:?}").contains("token-123"));

        let auth = AuthMethod::HmacSha256 {
            secret: "hmac-secret".into(),
            header: "X-Lockbox-Signature".into(),
        };
        let rendered = format!("{auth:?}");
        assert!(!rendered.contains("hmac-secret"));
        assert!(rendered.contains("X-Lockbox-Signature"));
    }
}
