//! Local-disk [`BlobStore`] backend.
//!
//! Blobs land under a root directory, sharded by the first two characters
//! of a generated id to keep directory fan-out sane. Refs look like
//! `fs:ab/ab12cd…` and only resolve against the root that issued them.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

use lockbox_blob::error::BlobError;
use lockbox_blob::store::{BlobStore, ByteStream};
use lockbox_blob::types::{BlobHint, BlobRef};

/// [`BlobStore`] backed by a local directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, BlobError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| BlobError::Write(format!("create blob root: {e}")))?;
        Ok(Self { root })
    }

    /// Resolve a ref to a path under the root.
    ///
    /// Rejects refs from other backends and anything that would escape the
    /// root (absolute paths, `..` components).
    fn resolve(&self, blob: &BlobRef) -> Result<PathBuf, BlobError> {
        let rel = blob
            .as_str()
            .strip_prefix("fs:")
            .ok_or_else(|| BlobError::InvalidRef(blob.to_string()))?;
        let rel = Path::new(rel);
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(BlobError::InvalidRef(blob.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, data: Bytes, hint: &BlobHint) -> Result<BlobRef, BlobError> {
        let key = uuid::Uuid::new_v4().simple().to_string();
        let shard = &key[..2];

        let dir = self.root.join(shard);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| BlobError::Write(format!("create shard dir: {e}")))?;

        // Write to a side file, then rename: the commit is atomic on the
        // same filesystem, so readers never see a half-written blob.
        let final_path = dir.join(&key);
        let partial_path = dir.join(format!("{key}.partial"));
        tokio::fs::write(&partial_path, &data)
            .await
            .map_err(|e| BlobError::Write(e.to_string()))?;
        tokio::fs::rename(&partial_path, &final_path)
            .await
            .map_err(|e| BlobError::Write(e.to_string()))?;

        debug!(blob = %key, size = data.len(), name = %hint.original_name, "blob committed");
        Ok(BlobRef::new(format!("fs:{shard}/{key}")))
    }

    async fn open_read(&self, blob: &BlobRef) -> Result<ByteStream, BlobError> {
        let path = self.resolve(blob)?;
        let file = match tokio::fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BlobError::NotFound(blob.to_string()));
            }
            Err(e) => return Err(BlobError::Read(e.to_string())),
        };
        Ok(ReaderStream::new(file)
            .map(|chunk| chunk.map_err(|e| BlobError::Read(e.to_string())))
            .boxed())
    }

    async fn delete(&self, blob: &BlobRef) -> Result<bool, BlobError> {
        let path = self.resolve(blob)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BlobError::Delete(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use lockbox_blob::store::read_to_bytes;

    use super::*;

    #[tokio::test]
    async fn put_read_delete_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();
        let hint = BlobHint::new("report.pdf", "application/pdf");

        let blob = store
            .put(Bytes::from_static(b"pdf bytes"), &hint)
            .await
            .unwrap();
        assert!(blob.as_str().starts_with("fs:"));

        let data = read_to_bytes(store.open_read(&blob).await.unwrap())
            .await
            .unwrap();
        assert_eq!(&data[..], b"pdf bytes");

        assert!(store.delete(&blob).await.unwrap());
        assert!(!store.delete(&blob).await.unwrap());
        assert!(matches!(
            store.open_read(&blob).await,
            Err(BlobError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn refs_survive_store_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let blob = {
            let store = FsBlobStore::open(dir.path()).await.unwrap();
            store
                .put(
                    Bytes::from_static(b"durable"),
                    &BlobHint::new("d.bin", "application/octet-stream"),
                )
                .await
                .unwrap()
        };

        let reopened = FsBlobStore::open(dir.path()).await.unwrap();
        let data = read_to_bytes(reopened.open_read(&blob).await.unwrap())
            .await
            .unwrap();
        assert_eq!(&data[..], b"durable");
    }

    #[tokio::test]
    async fn no_partial_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();
        store
            .put(
                Bytes::from(vec![7u8; 64 * 1024]),
                &BlobHint::new("big.bin", "application/octet-stream"),
            )
            .await
            .unwrap();

        let mut stack = vec![dir.path().to_path_buf()];
        while let Some(d) = stack.pop() {
            for entry in std::fs::read_dir(&d).unwrap() {
                let entry = entry.unwrap();
                if entry.file_type().unwrap().is_dir() {
                    stack.push(entry.path());
                } else {
                    let name = entry.file_name();
                    assert!(
                        !name.to_string_lossy().ends_with(".partial"),
                        "partial file left behind: {name:?}"
                    );
                }
            }
        }
    }

    #[tokio::test]
    async fn hostile_refs_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();

        for bad in ["mem:whatever", "fs:../../etc/passwd", "fs:/abs/path"] {
            let blob = BlobRef::new(bad);
            assert!(
                matches!(store.open_read(&blob).await, Err(BlobError::InvalidRef(_))),
                "ref should be rejected: {bad}"
            );
        }
    }
}
