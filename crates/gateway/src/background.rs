//! Background reaper for stale upload sessions.
//!
//! Container expiry is synchronous inside verify; the only asynchronous
//! lifecycle work is evicting upload sessions that were started and then
//! abandoned, so their buffered chunk bytes don't pile up.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::metrics::GatewayMetrics;
use crate::session::SessionMap;

/// Timing for the session reaper.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// How often to sweep (reference cadence: every ten minutes).
    pub sweep_interval: Duration,
    /// Idle age at which a session is evicted (reference: one hour).
    pub session_ttl: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(10 * 60),
            session_ttl: Duration::from_secs(60 * 60),
        }
    }
}

/// Periodic sweeper over the shared [`SessionMap`].
#[derive(Debug)]
pub struct Reaper {
    sessions: Arc<SessionMap>,
    metrics: Arc<GatewayMetrics>,
    config: ReaperConfig,
}

impl Reaper {
    /// Create a reaper over a session map.
    #[must_use]
    pub fn new(
        sessions: Arc<SessionMap>,
        metrics: Arc<GatewayMetrics>,
        config: ReaperConfig,
    ) -> Self {
        Self {
            sessions,
            metrics,
            config,
        }
    }

    /// Spawn the sweep loop. The returned handle stops it.
    #[must_use]
    pub fn spawn(self) -> ReaperHandle {
        let token = CancellationToken::new();
        let loop_token = token.clone();
        let handle = tokio::spawn(self.run(loop_token));
        ReaperHandle { token, handle }
    }

    async fn run(self, token: CancellationToken) {
        let mut tick = interval(self.config.sweep_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = tick.tick() => self.sweep_once(),
            }
        }
        debug!("session reaper stopped");
    }

    fn sweep_once(&self) {
        let (evicted, freed_bytes) = self.sessions.sweep_stale(self.config.session_ttl);
        if evicted > 0 {
            self.metrics.add_sessions_reaped(evicted as u64);
            info!(evicted, freed_bytes, "stale upload sessions reaped");
        }
    }
}

/// Handle to a running [`Reaper`].
#[derive(Debug)]
pub struct ReaperHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ReaperHandle {
    /// Stop the sweep loop and wait for it to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use lockbox_core::{ContainerId, UploadId};

    use crate::session::ChunkMeta;

    use super::*;

    fn meta() -> ChunkMeta {
        ChunkMeta {
            filename: "abandoned.bin".into(),
            mime_type: "application/octet-stream".into(),
            declared_size: 4,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_session_is_unreachable_after_sweep() {
        let sessions = Arc::new(SessionMap::new());
        let metrics = Arc::new(GatewayMetrics::default());
        let container = ContainerId::new("c1");
        let upload = UploadId::new("u1");

        sessions
            .get_or_create(&container, &upload, 3, &meta())
            .lock()
            .await
            .write_slot(0, Bytes::from_static(b"left"));

        let reaper = Reaper::new(
            Arc::clone(&sessions),
            Arc::clone(&metrics),
            ReaperConfig::default(),
        )
        .spawn();

        // One hour of idleness plus a sweep tick.
        tokio::time::sleep(Duration::from_secs(71 * 60)).await;

        assert!(sessions.is_empty(), "stale session should be gone");
        assert_eq!(metrics.snapshot().sessions_reaped, 1);

        reaper.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn active_session_survives_sweeps() {
        let sessions = Arc::new(SessionMap::new());
        let metrics = Arc::new(GatewayMetrics::default());
        let container = ContainerId::new("c1");

        let reaper = Reaper::new(
            Arc::clone(&sessions),
            Arc::clone(&metrics),
            ReaperConfig::default(),
        )
        .spawn();

        // Touch a fresh session every 30 minutes; each is younger than the
        // TTL whenever a sweep fires.
        for round in 0..4u32 {
            sessions.get_or_create(
                &container,
                &UploadId::new(format!("u{round}")),
                2,
                &meta(),
            );
            tokio::time::sleep(Duration::from_secs(30 * 60)).await;
        }

        // The oldest sessions have aged out, but the most recent one is
        // under the TTL and must survive.
        assert!(!sessions.is_empty());

        reaper.shutdown().await;
    }
}
