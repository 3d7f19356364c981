use std::sync::Arc;

use tokio_util::task::TaskTracker;

use lockbox_blob::store::BlobStore;
use lockbox_registry::lock::ContainerLock;
use lockbox_registry::store::ContainerRegistry;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::metrics::GatewayMetrics;
use crate::notify::FileEventNotifier;
use crate::session::SessionMap;

/// Fluent builder for constructing a [`Gateway`] instance.
///
/// A registry, a container lock, and a blob store must be supplied; the
/// notifier and config are optional.
#[derive(Default)]
pub struct GatewayBuilder {
    registry: Option<Arc<dyn ContainerRegistry>>,
    locks: Option<Arc<dyn ContainerLock>>,
    blobs: Option<Arc<dyn BlobStore>>,
    notifier: Option<Arc<dyn FileEventNotifier>>,
    config: Option<GatewayConfig>,
}

impl GatewayBuilder {
    /// Create a new builder with all fields unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the container registry backend.
    #[must_use]
    pub fn registry(mut self, registry: Arc<dyn ContainerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the per-container lock backend.
    #[must_use]
    pub fn locks(mut self, locks: Arc<dyn ContainerLock>) -> Self {
        self.locks = Some(locks);
        self
    }

    /// Set the blob store backend.
    #[must_use]
    pub fn blobs(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Set the file-added notifier.
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn FileEventNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Override the default [`GatewayConfig`].
    #[must_use]
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the gateway.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if a required backend is
    /// missing.
    pub fn build(self) -> Result<Gateway, GatewayError> {
        let registry = self
            .registry
            .ok_or_else(|| GatewayError::Configuration("container registry is required".into()))?;
        let locks = self
            .locks
            .ok_or_else(|| GatewayError::Configuration("container lock is required".into()))?;
        let blobs = self
            .blobs
            .ok_or_else(|| GatewayError::Configuration("blob store is required".into()))?;

        Ok(Gateway {
            registry,
            locks,
            blobs,
            sessions: Arc::new(SessionMap::new()),
            notifier: self.notifier,
            config: self.config.unwrap_or_default(),
            metrics: Arc::new(GatewayMetrics::default()),
            notify_tracker: TaskTracker::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbox_blob::memory::MemoryBlobStore;

    #[test]
    fn build_missing_backends_returns_error() {
        let result = GatewayBuilder::new().build();
        assert!(matches!(result, Err(GatewayError::Configuration(_))));

        let result = GatewayBuilder::new()
            .blobs(Arc::new(MemoryBlobStore::new()))
            .build();
        assert!(matches!(result, Err(GatewayError::Configuration(_))));
    }
}
