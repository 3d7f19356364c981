use std::time::Duration;

/// What to do when a blob delete fails while a container is expiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryPolicy {
    /// Delete the record regardless; log each orphaned blob at `warn`.
    #[default]
    DeleteRecordAnyway,
    /// Abort the expiry: the container stays alive with its counter pinned
    /// at the limit, so the next successful verify retries the deletion.
    RequireBlobDeletes,
}

/// Tunables for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// How long an upload session may sit idle before the reaper evicts it.
    pub session_ttl: Duration,
    /// How often the reaper sweeps for stale sessions.
    pub sweep_interval: Duration,
    /// Hard cap on search / listing result counts.
    pub max_results: usize,
    /// Upper bound on `total_chunks` a session may declare.
    pub max_total_chunks: u32,
    /// Blob-delete failure handling during view-limit expiry.
    pub expiry_policy: ExpiryPolicy,
    /// TTL on a held per-container lock; bounds how long a crashed holder
    /// can stall its container.
    pub lock_ttl: Duration,
    /// How long an operation waits for a contended container lock.
    pub lock_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_secs(10 * 60),
            max_results: 50,
            max_total_chunks: 10_000,
            expiry_policy: ExpiryPolicy::default(),
            lock_ttl: Duration::from_secs(30),
            lock_timeout: Duration::from_secs(10),
        }
    }
}
