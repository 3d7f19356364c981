use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lockbox_core::{ContainerId, FileEntry};

/// Delivery failure from a notifier backend.
#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Event emitted when a reassembled file is committed to a container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAddedEvent {
    pub container_id: ContainerId,
    pub container_name: String,
    pub file: FileEntry,
    pub occurred_at: DateTime<Utc>,
}

/// Outbound seam for file-add notifications.
///
/// The gateway fires these fire-and-forget on a tracked task; delivery
/// failures are counted and logged, never surfaced to the uploader.
#[async_trait]
pub trait FileEventNotifier: Send + Sync {
    /// Deliver a file-added event.
    async fn file_added(&self, event: &FileAddedEvent) -> Result<(), NotifyError>;
}
