use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters tracking gateway activity.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    /// Containers created.
    pub containers_created: AtomicU64,
    /// Successful verifies (either role).
    pub verifies_ok: AtomicU64,
    /// Verifies rejected with an invalid secret.
    pub verifies_rejected: AtomicU64,
    /// Containers destroyed by reaching their view limit.
    pub containers_expired: AtomicU64,
    /// Chunks accepted into upload sessions.
    pub chunks_received: AtomicU64,
    /// Files committed through reassembly.
    pub files_assembled: AtomicU64,
    /// Files removed by explicit deletion.
    pub files_deleted: AtomicU64,
    /// Stale upload sessions evicted by the reaper.
    pub sessions_reaped: AtomicU64,
    /// Blob deletes that failed and left an orphan behind.
    pub orphaned_blobs: AtomicU64,
    /// File-added notifications that failed to deliver.
    pub notify_failures: AtomicU64,
}

/// Point-in-time copy of [`GatewayMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub containers_created: u64,
    pub verifies_ok: u64,
    pub verifies_rejected: u64,
    pub containers_expired: u64,
    pub chunks_received: u64,
    pub files_assembled: u64,
    pub files_deleted: u64,
    pub sessions_reaped: u64,
    pub orphaned_blobs: u64,
    pub notify_failures: u64,
}

impl GatewayMetrics {
    pub fn increment_containers_created(&self) {
        self.containers_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_verifies_ok(&self) {
        self.verifies_ok.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_verifies_rejected(&self) {
        self.verifies_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_containers_expired(&self) {
        self.containers_expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chunks_received(&self) {
        self.chunks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_files_assembled(&self) {
        self.files_assembled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_files_deleted(&self) {
        self.files_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_sessions_reaped(&self, count: u64) {
        self.sessions_reaped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_orphaned_blobs(&self) {
        self.orphaned_blobs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_notify_failures(&self) {
        self.notify_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a relaxed snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            containers_created: self.containers_created.load(Ordering::Relaxed),
            verifies_ok: self.verifies_ok.load(Ordering::Relaxed),
            verifies_rejected: self.verifies_rejected.load(Ordering::Relaxed),
            containers_expired: self.containers_expired.load(Ordering::Relaxed),
            chunks_received: self.chunks_received.load(Ordering::Relaxed),
            files_assembled: self.files_assembled.load(Ordering::Relaxed),
            files_deleted: self.files_deleted.load(Ordering::Relaxed),
            sessions_reaped: self.sessions_reaped.load(Ordering::Relaxed),
            orphaned_blobs: self.orphaned_blobs.load(Ordering::Relaxed),
            notify_failures: self.notify_failures.load(Ordering::Relaxed),
        }
    }
}
