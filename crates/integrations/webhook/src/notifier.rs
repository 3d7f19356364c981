use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;
use tracing::debug;

use lockbox_gateway::{FileAddedEvent, FileEventNotifier, NotifyError};

use crate::config::{AuthMethod, WebhookConfig};
use crate::error::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Delivers [`FileAddedEvent`]s to an HTTP endpoint as JSON.
///
/// Implements the gateway's [`FileEventNotifier`] seam. Supports bearer
/// auth and HMAC-SHA256 body signatures so receivers can authenticate the
/// sender.
pub struct WebhookNotifier {
    config: WebhookConfig,
    client: Client,
}

impl WebhookNotifier {
    /// Create a notifier with a dedicated `reqwest::Client`.
    pub fn new(config: WebhookConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to build HTTP client");
        Self { config, client }
    }

    /// Create a notifier with a caller-supplied client.
    ///
    /// Useful for testing or for sharing a connection pool.
    #[must_use]
    pub fn with_client(config: WebhookConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Compute the HMAC-SHA256 signature of the request body.
    fn compute_hmac(secret: &str, body: &[u8]) -> Result<String, WebhookError> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| WebhookError::SigningError(format!("invalid HMAC key: {e}")))?;
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Apply authentication to the request builder.
    fn apply_auth(
        &self,
        mut request: reqwest::RequestBuilder,
        body: &[u8],
    ) -> Result<reqwest::RequestBuilder, WebhookError> {
        match &self.config.auth {
            Some(AuthMethod::Bearer(token)) => {
                request = request.bearer_auth(token);
            }
            Some(AuthMethod::HmacSha256 { secret, header }) => {
                let signature = Self::compute_hmac(secret, body)?;
                request = request.header(header, format!("sha256={signature}"));
            }
            None => {}
        }
        Ok(request)
    }

    async fn deliver(&self, event: &FileAddedEvent) -> Result<(), WebhookError> {
        let body = serde_json::to_vec(event)
            .map_err(|e| WebhookError::InvalidPayload(format!("failed to serialize event: {e}")))?;

        let request = self
            .client
            .post(&self.config.url)
            .header("content-type", "application/json");
        let request = self.apply_auth(request, &body)?;

        let response = request.body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WebhookError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        debug!(container = %event.container_id, file = %event.file.id, "webhook delivered");
        Ok(())
    }
}

#[async_trait]
impl FileEventNotifier for WebhookNotifier {
    async fn file_added(&self, event: &FileAddedEvent) -> Result<(), NotifyError> {
        self.deliver(event).await.map_err(NotifyError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_matches_known_vector() {
        // RFC test vector: HMAC-SHA256("key", "The quick brown fox ...").
        let sig = WebhookNotifier::compute_hmac(
            "key",
            b"The quick brown fox jumps over the lazy dog",
        )
        .unwrap();
        assert_eq!(
            sig,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn hmac_depends_on_secret() {
        let a = WebhookNotifier::compute_hmac("secret-a", b"body").unwrap();
        let b = WebhookNotifier::compute_hmac("secret-b", b"body").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64, "signature should be 32 hex-encoded bytes");
    }
}
