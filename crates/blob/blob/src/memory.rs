use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::StreamExt;

use crate::error::BlobError;
use crate::store::{BlobStore, ByteStream};
use crate::types::{BlobHint, BlobRef};

/// In-memory [`BlobStore`] for tests and small deployments.
///
/// Blobs live in a [`DashMap`] keyed by a generated id; refs carry a
/// `mem:` prefix so a ref from another backend fails loudly instead of
/// resolving to garbage.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, Bytes>,
}

impl MemoryBlobStore {
    /// Create a new, empty in-memory blob store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether the store holds no blobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    fn key_of(blob: &BlobRef) -> Result<&str, BlobError> {
        blob.as_str()
            .strip_prefix("mem:")
            .ok_or_else(|| BlobError::InvalidRef(blob.to_string()))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: Bytes, _hint: &BlobHint) -> Result<BlobRef, BlobError> {
        let key = uuid::Uuid::new_v4().to_string();
        let blob = BlobRef::new(format!("mem:{key}"));
        self.blobs.insert(key, data);
        Ok(blob)
    }

    async fn open_read(&self, blob: &BlobRef) -> Result<ByteStream, BlobError> {
        let key = Self::key_of(blob)?;
        let data = self
            .blobs
            .get(key)
            .map(|b| b.clone())
            .ok_or_else(|| BlobError::NotFound(blob.to_string()))?;
        Ok(futures::stream::once(async move { Ok(data) }).boxed())
    }

    async fn delete(&self, blob: &BlobRef) -> Result<bool, BlobError> {
        let key = Self::key_of(blob)?;
        Ok(self.blobs.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::read_to_bytes;

    #[tokio::test]
    async fn put_read_delete_roundtrip() {
        let store = MemoryBlobStore::new();
        let hint = BlobHint::new("notes.txt", "text/plain");

        let blob = store
            .put(Bytes::from_static(b"hello blob"), &hint)
            .await
            .unwrap();
        assert!(blob.as_str().starts_with("mem:"));

        let stream = store.open_read(&blob).await.unwrap();
        let data = read_to_bytes(stream).await.unwrap();
        assert_eq!(&data[..], b"hello blob");

        assert!(store.delete(&blob).await.unwrap());
        assert!(!store.delete(&blob).await.unwrap());
        assert!(matches!(
            store.open_read(&blob).await,
            Err(BlobError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn foreign_ref_is_rejected() {
        let store = MemoryBlobStore::new();
        let foreign = BlobRef::new("fs:2024/ab/whatever");
        assert!(matches!(
            store.open_read(&foreign).await,
            Err(BlobError::InvalidRef(_))
        ));
        assert!(matches!(
            store.delete(&foreign).await,
            Err(BlobError::InvalidRef(_))
        ));
    }
}
