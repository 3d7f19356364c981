use thiserror::Error;

use lockbox_gateway::NotifyError;

/// Errors specific to webhook delivery.
///
/// Converted into [`NotifyError`] at the notifier seam; the gateway logs
/// and counts delivery failures without surfacing them to uploaders.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// An HTTP-level transport error occurred.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote endpoint returned a non-success status code.
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The event could not be serialized for the request body.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// HMAC signature computation failed.
    #[error("HMAC signing error: {0}")]
    SigningError(String),
}

impl From<WebhookError> for NotifyError {
    fn from(err: WebhookError) -> Self {
        NotifyError(err.to_string())
    }
}
