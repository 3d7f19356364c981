use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use futures::stream::BoxStream;

use crate::error::BlobError;
use crate::types::{BlobHint, BlobRef};

/// Stream of blob content chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes, BlobError>>;

/// Pluggable storage backend for file content.
///
/// Implementors provide the actual storage mechanism (local disk, a remote
/// object service, memory). Refs returned by one backend are meaningless to
/// any other.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a blob and return its reference.
    async fn put(&self, data: Bytes, hint: &BlobHint) -> Result<BlobRef, BlobError>;

    /// Open the blob's content for reading.
    ///
    /// Remote backends follow redirects transparently; the caller imposes
    /// the original filename and MIME type on whatever it serves.
    async fn open_read(&self, blob: &BlobRef) -> Result<ByteStream, BlobError>;

    /// Delete a blob. Returns `true` if the blob existed.
    async fn delete(&self, blob: &BlobRef) -> Result<bool, BlobError>;
}

/// Drain a [`ByteStream`] into one contiguous buffer.
pub async fn read_to_bytes(mut stream: ByteStream) -> Result<Bytes, BlobError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}
