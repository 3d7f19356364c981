//! In-flight chunked upload sessions.
//!
//! Sessions are process-local and never persisted: losing them on restart
//! is safe because clients re-upload. A multi-process deployment would
//! back this map with a shared cache instead; the single-process map is a
//! deliberate simplification.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use lockbox_core::{ContainerId, FileEntry, UploadId};

/// Metadata captured from the first chunk of an upload.
#[derive(Debug, Clone)]
pub struct ChunkMeta {
    /// Filename as the uploader named it.
    pub filename: String,
    /// MIME content type.
    pub mime_type: String,
    /// Total size the client claims it will upload.
    pub declared_size: u64,
}

/// One in-flight chunked upload.
///
/// `slots[i]` holds chunk `i`'s bytes once it arrived; arrival order is
/// irrelevant because assembly walks the slots by index.
#[derive(Debug)]
pub struct ChunkSession {
    pub total_chunks: u32,
    pub meta: ChunkMeta,
    pub created_at: Instant,
    slots: Vec<Option<Bytes>>,
    filled: u32,
    completed: Option<FileEntry>,
}

impl ChunkSession {
    fn new(total_chunks: u32, meta: ChunkMeta) -> Self {
        Self {
            total_chunks,
            meta,
            created_at: Instant::now(),
            slots: vec![None; total_chunks as usize],
            filled: 0,
            completed: None,
        }
    }

    /// The committed file, if this session already finished.
    ///
    /// A retry that slips in between reassembly and the session's removal
    /// from the map must see the committed file instead of firing
    /// reassembly a second time.
    #[must_use]
    pub fn completed(&self) -> Option<&FileEntry> {
        self.completed.as_ref()
    }

    /// Mark the session finished and drop its buffers.
    pub fn mark_completed(&mut self, file: FileEntry) {
        self.completed = Some(file);
        self.slots = Vec::new();
    }

    /// Store chunk bytes in their slot. Returns `true` if the slot was
    /// already filled (client retry); the write overwrites rather than
    /// duplicating.
    pub fn write_slot(&mut self, index: u32, data: Bytes) -> bool {
        let slot = &mut self.slots[index as usize];
        let retried = slot.is_some();
        if !retried {
            self.filled += 1;
        }
        *slot = Some(data);
        retried
    }

    /// Number of distinct chunks received so far.
    #[must_use]
    pub fn received(&self) -> u32 {
        self.filled
    }

    /// Whether every slot is filled.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.filled == self.total_chunks
    }

    /// Sum of currently buffered chunk bytes.
    #[must_use]
    pub fn buffered_bytes(&self) -> u64 {
        self.slots
            .iter()
            .flatten()
            .map(|b| b.len() as u64)
            .sum()
    }

    /// Concatenate all chunks strictly by index into one buffer.
    ///
    /// The slots stay filled: if the downstream blob write fails, the
    /// session must survive intact so the client can retry.
    ///
    /// # Panics
    ///
    /// Panics if the session is incomplete; callers check
    /// [`is_complete`](Self::is_complete) first.
    #[must_use]
    pub fn assemble(&self) -> Bytes {
        assert!(self.is_complete(), "assemble called on incomplete session");
        let total: usize = self.slots.iter().flatten().map(Bytes::len).sum();
        let mut buf = BytesMut::with_capacity(total);
        for slot in &self.slots {
            buf.extend_from_slice(slot.as_ref().expect("slot filled"));
        }
        buf.freeze()
    }
}

type SessionKey = (String, String);

/// Concurrent map of in-flight sessions keyed by `(container, upload)`.
///
/// Each session sits behind its own async mutex: chunk writes and the
/// completion check for one upload serialize on it, while distinct uploads
/// never contend.
#[derive(Debug, Default)]
pub struct SessionMap {
    sessions: DashMap<SessionKey, Arc<Mutex<ChunkSession>>>,
}

impl SessionMap {
    /// Create an empty session map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(container_id: &ContainerId, upload_id: &UploadId) -> SessionKey {
        (
            container_id.as_str().to_owned(),
            upload_id.as_str().to_owned(),
        )
    }

    /// Fetch the session for this upload, creating it from `total_chunks`
    /// and `meta` on first contact. Consistency of `total_chunks` against
    /// an existing session is the caller's check, made under the session's
    /// mutex.
    pub fn get_or_create(
        &self,
        container_id: &ContainerId,
        upload_id: &UploadId,
        total_chunks: u32,
        meta: &ChunkMeta,
    ) -> Arc<Mutex<ChunkSession>> {
        self.sessions
            .entry(Self::key(container_id, upload_id))
            .or_insert_with(|| Arc::new(Mutex::new(ChunkSession::new(total_chunks, meta.clone()))))
            .clone()
    }

    /// Drop a session (completed or abandoned), freeing its buffers once
    /// the last holder of the `Arc` lets go.
    pub fn remove(&self, container_id: &ContainerId, upload_id: &UploadId) -> bool {
        self.sessions
            .remove(&Self::key(container_id, upload_id))
            .is_some()
    }

    /// Drop every session belonging to a container (used when the
    /// container vanishes mid-upload).
    pub fn remove_container(&self, container_id: &ContainerId) -> usize {
        let mut removed = 0usize;
        self.sessions.retain(|(cid, _), _| {
            if cid == container_id.as_str() {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    /// Evict sessions older than `ttl`. Returns the number evicted and the
    /// chunk bytes they were buffering.
    ///
    /// Uses try-lock: a session busy in a chunk write is by definition not
    /// stale, so skipping it is correct.
    pub fn sweep_stale(&self, ttl: Duration) -> (usize, u64) {
        let cutoff = Instant::now();
        let mut evicted = 0usize;
        let mut freed = 0u64;
        self.sessions.retain(|_, session| {
            let Ok(guard) = session.try_lock() else {
                return true;
            };
            if cutoff.duration_since(guard.created_at) >= ttl {
                evicted += 1;
                freed += guard.buffered_bytes();
                false
            } else {
                true
            }
        });
        (evicted, freed)
    }

    /// Number of in-flight sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> ChunkMeta {
        ChunkMeta {
            filename: "movie.mp4".into(),
            mime_type: "video/mp4".into(),
            declared_size: 9,
        }
    }

    #[test]
    fn assembly_is_index_ordered_not_arrival_ordered() {
        let mut session = ChunkSession::new(3, meta());
        session.write_slot(2, Bytes::from_static(b"ccc"));
        session.write_slot(0, Bytes::from_static(b"aaa"));
        assert!(!session.is_complete());
        session.write_slot(1, Bytes::from_static(b"bbb"));
        assert!(session.is_complete());
        assert_eq!(&session.assemble()[..], b"aaabbbccc");
    }

    #[test]
    fn retried_slot_overwrites() {
        let mut session = ChunkSession::new(2, meta());
        assert!(!session.write_slot(0, Bytes::from_static(b"first")));
        assert!(session.write_slot(0, Bytes::from_static(b"retry")));
        assert_eq!(session.received(), 1);
        session.write_slot(1, Bytes::from_static(b"!"));
        assert_eq!(&session.assemble()[..], b"retry!");
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_evicts_only_stale_sessions() {
        let map = SessionMap::new();
        let container = ContainerId::new("c1");

        map.get_or_create(&container, &UploadId::new("old"), 2, &meta())
            .lock()
            .await
            .write_slot(0, Bytes::from_static(b"stale bytes"));

        tokio::time::advance(Duration::from_secs(45 * 60)).await;

        map.get_or_create(&container, &UploadId::new("young"), 2, &meta());

        tokio::time::advance(Duration::from_secs(20 * 60)).await;

        // "old" is 65 minutes stale, "young" only 20.
        let (evicted, freed) = map.sweep_stale(Duration::from_secs(60 * 60));
        assert_eq!(evicted, 1);
        assert_eq!(freed, "stale bytes".len() as u64);
        assert_eq!(map.len(), 1);
    }

    #[tokio::test]
    async fn remove_container_drops_only_its_sessions() {
        let map = SessionMap::new();
        let a = ContainerId::new("a");
        let b = ContainerId::new("b");
        map.get_or_create(&a, &UploadId::new("u1"), 1, &meta());
        map.get_or_create(&a, &UploadId::new("u2"), 1, &meta());
        map.get_or_create(&b, &UploadId::new("u1"), 1, &meta());

        assert_eq!(map.remove_container(&a), 2);
        assert_eq!(map.len(), 1);
    }
}
