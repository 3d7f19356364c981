//! Remote object-service [`BlobStore`] backend.
//!
//! Talks to an HTTP object service that files uploads under a resource
//! class (`image`/`video`/`raw`) and hands back an object id. Refs look
//! like `remote:video:abc123`. Reads follow redirects transparently (the
//! service may bounce to a CDN) and the caller imposes the original
//! filename and MIME type on whatever it serves, so nothing here depends
//! on the backend's URL paths.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use lockbox_blob::error::BlobError;
use lockbox_blob::store::{BlobStore, ByteStream};
use lockbox_blob::types::{BlobHint, BlobRef, ResourceClass};

/// Configuration for [`RemoteBlobStore`].
#[derive(Clone)]
pub struct RemoteConfig {
    /// Base URL of the object service, without a trailing slash.
    pub base_url: String,
    /// Optional bearer token for authenticated services.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl RemoteConfig {
    /// Config for an unauthenticated service with a 30 second timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Response body of a successful upload.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
}

/// [`BlobStore`] backed by a remote object service.
pub struct RemoteBlobStore {
    config: RemoteConfig,
    client: reqwest::Client,
}

impl RemoteBlobStore {
    /// Create a store from config.
    ///
    /// Uses a dedicated `reqwest::Client` with redirect following enabled;
    /// object services commonly 302 reads out to a CDN.
    pub fn new(config: RemoteConfig) -> Result<Self, BlobError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::default())
            .build()
            .map_err(|e| BlobError::Write(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Create a store with a caller-supplied client (shared pools, tests).
    #[must_use]
    pub fn with_client(config: RemoteConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn object_url(&self, class: ResourceClass, public_id: &str) -> String {
        format!("{}/{}/{}", self.config.base_url, class, public_id)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Split a `remote:{class}:{public_id}` ref into its parts.
    fn parse_ref(blob: &BlobRef) -> Result<(ResourceClass, &str), BlobError> {
        let rest = blob
            .as_str()
            .strip_prefix("remote:")
            .ok_or_else(|| BlobError::InvalidRef(blob.to_string()))?;
        let (class, public_id) = rest
            .split_once(':')
            .ok_or_else(|| BlobError::InvalidRef(blob.to_string()))?;
        let class = match class {
            "image" => ResourceClass::Image,
            "video" => ResourceClass::Video,
            "raw" => ResourceClass::Raw,
            _ => return Err(BlobError::InvalidRef(blob.to_string())),
        };
        if public_id.is_empty() {
            return Err(BlobError::InvalidRef(blob.to_string()));
        }
        Ok((class, public_id))
    }

    fn format_ref(class: ResourceClass, public_id: &str) -> BlobRef {
        BlobRef::new(format!("remote:{class}:{public_id}"))
    }
}

#[async_trait]
impl BlobStore for RemoteBlobStore {
    async fn put(&self, data: Bytes, hint: &BlobHint) -> Result<BlobRef, BlobError> {
        let class = ResourceClass::from_mime(&hint.mime_type);
        let url = format!("{}/{}/upload", self.config.base_url, class);

        let part = reqwest::multipart::Part::stream(data.clone())
            .file_name(hint.original_name.clone())
            .mime_str(&hint.mime_type)
            .map_err(|e| BlobError::Write(format!("invalid MIME type: {e}")))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .authed(self.client.post(&url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| BlobError::Write(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BlobError::Write(format!("HTTP {status}: {body}")));
        }

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| BlobError::Write(format!("malformed upload response: {e}")))?;

        debug!(public_id = %upload.public_id, %class, size = data.len(), "blob uploaded");
        Ok(Self::format_ref(class, &upload.public_id))
    }

    async fn open_read(&self, blob: &BlobRef) -> Result<ByteStream, BlobError> {
        let (class, public_id) = Self::parse_ref(blob)?;
        let url = self.object_url(class, public_id);

        let response = self
            .authed(self.client.get(&url))
            .send()
            .await
            .map_err(|e| BlobError::Read(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BlobError::NotFound(blob.to_string()));
        }
        if !status.is_success() {
            return Err(BlobError::Read(format!("HTTP {status}")));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| BlobError::Read(e.to_string())))
            .boxed())
    }

    async fn delete(&self, blob: &BlobRef) -> Result<bool, BlobError> {
        let (class, public_id) = Self::parse_ref(blob)?;
        let url = self.object_url(class, public_id);

        let response = self
            .authed(self.client.delete(&url))
            .send()
            .await
            .map_err(|e| BlobError::Delete(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(BlobError::Delete(format!("HTTP {status}")));
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_roundtrip() {
        let blob = RemoteBlobStore::format_ref(ResourceClass::Video, "abc123");
        assert_eq!(blob.as_str(), "remote:video:abc123");
        let (class, id) = RemoteBlobStore::parse_ref(&blob).unwrap();
        assert_eq!(class, ResourceClass::Video);
        assert_eq!(id, "abc123");
    }

    #[test]
    fn hostile_refs_are_rejected() {
        for bad in [
            "fs:ab/cd",
            "remote:",
            "remote:video",
            "remote:video:",
            "remote:archive:abc",
        ] {
            assert!(
                matches!(
                    RemoteBlobStore::parse_ref(&BlobRef::new(bad)),
                    Err(BlobError::InvalidRef(_))
                ),
                "ref should be rejected: {bad}"
            );
        }
    }

    #[test]
    fn config_debug_redacts_api_key() {
        let mut config = RemoteConfig::new("https://objects.example.com");
        config.api_key = Some("super-secret".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn object_urls_are_class_scoped() {
        let store =
            RemoteBlobStore::new(RemoteConfig::new("https://objects.example.com")).unwrap();
        assert_eq!(
            store.object_url(ResourceClass::Raw, "xyz"),
            "https://objects.example.com/raw/xyz"
        );
    }
}
