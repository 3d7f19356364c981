use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};

use lockbox_blob::error::BlobError;
use lockbox_blob::store::{BlobStore, ByteStream};
use lockbox_blob::types::{BlobHint, BlobRef};
use lockbox_core::{
    AccessMode, Container, ContainerId, ContainerSummary, FileEntry, FileId, Role, UploadId,
    hash_secret, match_secret,
};
use lockbox_registry::lock::ContainerLock;
use lockbox_registry::store::ContainerRegistry;

use crate::config::{ExpiryPolicy, GatewayConfig};
use crate::error::GatewayError;
use crate::metrics::GatewayMetrics;
use crate::notify::{FileAddedEvent, FileEventNotifier};
use crate::session::{ChunkMeta, SessionMap};

/// Request to create a container.
#[derive(Debug, Clone)]
pub struct CreateContainer {
    pub name: String,
    pub visitor_secret: String,
    /// Required for [`AccessMode::Split`], rejected for
    /// [`AccessMode::Standard`].
    pub admin_secret: Option<String>,
    pub access_mode: AccessMode,
    /// 0 = unlimited views.
    pub max_views: u32,
}

/// Outcome of a successful verify.
#[derive(Debug, Clone)]
pub struct Verified {
    /// Snapshot of the container as unlocked by this call.
    pub container: Container,
    /// The role the supplied secret earned.
    pub role: Role,
    /// Set only on the response handed to the caller whose verify consumed
    /// the last view. The container no longer exists.
    pub destroyed: bool,
}

/// Outcome of accepting one chunk.
#[derive(Debug, Clone)]
pub enum ChunkOutcome {
    /// The session is still missing chunks.
    Pending {
        chunk_index: u32,
        received: u32,
        total_chunks: u32,
    },
    /// This chunk completed the session; the file is committed.
    Complete { file: FileEntry },
}

/// The ephemeral container store.
///
/// Orchestrates the access gate, the chunk reassembler, and container
/// lifecycle over pluggable registry, lock, and blob-store backends. Every
/// mutation of a container record happens under that container's lock;
/// distinct containers never contend.
pub struct Gateway {
    pub(crate) registry: Arc<dyn ContainerRegistry>,
    pub(crate) locks: Arc<dyn ContainerLock>,
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) sessions: Arc<SessionMap>,
    pub(crate) notifier: Option<Arc<dyn FileEventNotifier>>,
    pub(crate) config: GatewayConfig,
    pub(crate) metrics: Arc<GatewayMetrics>,
    pub(crate) notify_tracker: TaskTracker,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Start building a gateway.
    #[must_use]
    pub fn builder() -> crate::builder::GatewayBuilder {
        crate::builder::GatewayBuilder::new()
    }

    /// The gateway's metrics counters.
    #[must_use]
    pub fn metrics(&self) -> &Arc<GatewayMetrics> {
        &self.metrics
    }

    /// The in-flight upload session map (shared with the reaper).
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionMap> {
        &self.sessions
    }

    /// Create a new container.
    #[instrument(name = "gateway.create_container", skip_all, fields(name = %request.name))]
    pub async fn create_container(
        &self,
        request: CreateContainer,
    ) -> Result<Container, GatewayError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "container name must not be empty".into(),
            ));
        }
        if request.visitor_secret.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "visitor secret must not be empty".into(),
            ));
        }
        let admin_secret_hash = match (request.access_mode, &request.admin_secret) {
            (AccessMode::Split, Some(secret)) if !secret.is_empty() => Some(hash_secret(secret)?),
            (AccessMode::Split, _) => {
                return Err(GatewayError::InvalidRequest(
                    "split mode requires an admin secret".into(),
                ));
            }
            (AccessMode::Standard, Some(_)) => {
                return Err(GatewayError::InvalidRequest(
                    "standard mode takes no admin secret".into(),
                ));
            }
            (AccessMode::Standard, None) => None,
        };

        let now = Utc::now();
        let container = Container {
            id: ContainerId::generate(),
            name: name.to_owned(),
            visitor_secret_hash: hash_secret(&request.visitor_secret)?,
            admin_secret_hash,
            access_mode: request.access_mode,
            max_views: request.max_views,
            current_views: 0,
            files: Vec::new(),
            created_at: now,
            last_accessed_at: now,
            deleted: false,
        };

        self.registry.insert(container.clone()).await?;
        self.metrics.increment_containers_created();
        info!(
            container = %container.id,
            mode = ?container.access_mode,
            max_views = container.max_views,
            "container created"
        );
        Ok(container)
    }

    /// Unlock a container with a secret.
    ///
    /// The view-count increment and the limit check run under the
    /// container's lock: two verifies racing for the last view observe a
    /// total order, exactly one of them triggers destruction, and only
    /// that one receives `destroyed = true`.
    #[instrument(name = "gateway.verify", skip_all, fields(container = %container_id))]
    pub async fn verify(
        &self,
        container_id: &ContainerId,
        supplied_secret: &str,
    ) -> Result<Verified, GatewayError> {
        let guard = self
            .locks
            .acquire(container_id, self.config.lock_ttl, self.config.lock_timeout)
            .await
            .map_err(GatewayError::from)?;

        let outcome = self.verify_locked(container_id, supplied_secret).await;

        if let Err(e) = guard.release().await {
            debug!(error = %e, "container lock release failed");
        }
        outcome
    }

    async fn verify_locked(
        &self,
        container_id: &ContainerId,
        supplied_secret: &str,
    ) -> Result<Verified, GatewayError> {
        let Some(mut container) = self.registry.get(container_id).await? else {
            return Err(GatewayError::NotFound(container_id.to_string()));
        };

        let Some(role) = match_secret(&container, supplied_secret)? else {
            self.metrics.increment_verifies_rejected();
            return Err(GatewayError::InvalidSecret);
        };

        container.last_accessed_at = Utc::now();

        if container.view_limited() {
            // Clamp at the limit so a strict-policy expiry that aborts and
            // retries never pushes the visible counter past max_views.
            container.current_views = (container.current_views + 1).min(container.max_views);
            if container.current_views >= container.max_views {
                return self.expire_container(container, role).await;
            }
        }

        self.registry.update(&container).await?;
        self.metrics.increment_verifies_ok();
        debug!(role = ?role, views = container.current_views, "container unlocked");
        Ok(Verified {
            container,
            role,
            destroyed: false,
        })
    }

    /// Destroy a container that consumed its last view.
    ///
    /// Blob deletes come first; under the default policy a failure leaves
    /// an orphaned blob behind (logged, counted) and never blocks record
    /// deletion. Under [`ExpiryPolicy::RequireBlobDeletes`] the expiry
    /// aborts instead and the next verify retries.
    async fn expire_container(
        &self,
        mut container: Container,
        role: Role,
    ) -> Result<Verified, GatewayError> {
        let mut failed_deletes = 0usize;
        for file in &container.files {
            let blob = BlobRef::new(file.storage_ref.clone());
            match self.blobs.delete(&blob).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(%blob, file = %file.id, "blob already gone during expiry");
                }
                Err(e) => {
                    failed_deletes += 1;
                    self.metrics.increment_orphaned_blobs();
                    warn!(%blob, file = %file.id, error = %e, "blob delete failed during expiry");
                }
            }
        }

        if failed_deletes > 0 && self.config.expiry_policy == ExpiryPolicy::RequireBlobDeletes {
            // Keep the record alive with the counter pinned at the limit;
            // the next successful verify lands here again and retries.
            self.registry.update(&container).await?;
            return Err(GatewayError::StorageDelete(format!(
                "{failed_deletes} blob(s) survived expiry of container {}",
                container.id
            )));
        }

        self.registry.remove(&container.id).await?;
        self.sessions.remove_container(&container.id);
        container.deleted = true;

        self.metrics.increment_verifies_ok();
        self.metrics.increment_containers_expired();
        info!(
            container = %container.id,
            views = container.current_views,
            files = container.files.len(),
            "container reached its view limit and was destroyed"
        );
        Ok(Verified {
            container,
            role,
            destroyed: true,
        })
    }

    /// Plain lookup by id, used to refresh a client's view after a prior
    /// successful verify. Never touches the view counter.
    #[instrument(name = "gateway.get_by_id", skip_all, fields(container = %container_id))]
    pub async fn get_by_id(&self, container_id: &ContainerId) -> Result<Container, GatewayError> {
        self.registry
            .get(container_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(container_id.to_string()))
    }

    /// Open a file's content for download.
    ///
    /// Returns the entry alongside the stream: the transport imposes the
    /// entry's original filename and MIME type on the response regardless
    /// of what the blob backend's paths imply. Callers gate this behind a
    /// prior successful verify.
    #[instrument(
        name = "gateway.open_file",
        skip_all,
        fields(container = %container_id, file = %file_id)
    )]
    pub async fn open_file(
        &self,
        container_id: &ContainerId,
        file_id: &FileId,
    ) -> Result<(FileEntry, ByteStream), GatewayError> {
        let container = self.get_by_id(container_id).await?;
        let Some(entry) = container.file(file_id) else {
            return Err(GatewayError::NotFound(file_id.to_string()));
        };
        let stream = self
            .blobs
            .open_read(&BlobRef::new(entry.storage_ref.clone()))
            .await
            .map_err(|e| match e {
                BlobError::NotFound(blob) => GatewayError::NotFound(blob),
                other => GatewayError::StorageRead(other.to_string()),
            })?;
        Ok((entry.clone(), stream))
    }

    /// Spawn the session reaper with this gateway's configured cadence.
    #[must_use]
    pub fn spawn_reaper(&self) -> crate::background::ReaperHandle {
        crate::background::Reaper::new(
            Arc::clone(&self.sessions),
            Arc::clone(&self.metrics),
            crate::background::ReaperConfig {
                sweep_interval: self.config.sweep_interval,
                session_ttl: self.config.session_ttl,
            },
        )
        .spawn()
    }

    /// Accept one chunk of a chunked upload.
    ///
    /// Chunk writes for one upload serialize on the session's mutex, and
    /// the all-slots-filled check runs under that same mutex, so
    /// reassembly fires exactly once no matter how arrivals interleave.
    #[instrument(
        name = "gateway.put_chunk",
        skip_all,
        fields(container = %container_id, upload = %upload_id, index = chunk_index)
    )]
    #[allow(clippy::too_many_arguments)]
    pub async fn put_chunk(
        &self,
        container_id: &ContainerId,
        upload_id: &UploadId,
        chunk_index: u32,
        total_chunks: u32,
        data: Bytes,
        meta: ChunkMeta,
    ) -> Result<ChunkOutcome, GatewayError> {
        if total_chunks == 0 || total_chunks > self.config.max_total_chunks {
            return Err(GatewayError::InvalidChunk(format!(
                "total_chunks {total_chunks} outside 1..={}",
                self.config.max_total_chunks
            )));
        }
        if chunk_index >= total_chunks {
            return Err(GatewayError::InvalidChunk(format!(
                "chunk index {chunk_index} out of range for {total_chunks} chunks"
            )));
        }

        // The container must still exist; if it vanished mid-upload, drop
        // everything buffered for it.
        if self.registry.get(container_id).await?.is_none() {
            self.sessions.remove_container(container_id);
            return Err(GatewayError::NotFound(container_id.to_string()));
        }

        let session = self
            .sessions
            .get_or_create(container_id, upload_id, total_chunks, &meta);
        let mut state = session.lock().await;

        // A retry can race the session's removal from the map; the
        // completion marker keeps reassembly single-fire.
        if let Some(file) = state.completed() {
            return Ok(ChunkOutcome::Complete { file: file.clone() });
        }

        if state.total_chunks != total_chunks {
            return Err(GatewayError::SessionMismatch {
                upload_id: upload_id.to_string(),
                expected: state.total_chunks,
                declared: total_chunks,
            });
        }

        if state.write_slot(chunk_index, data) {
            debug!("chunk retry overwrote its slot");
        }
        self.metrics.increment_chunks_received();

        if !state.is_complete() {
            return Ok(ChunkOutcome::Pending {
                chunk_index,
                received: state.received(),
                total_chunks,
            });
        }

        let file = self
            .finish_upload(container_id, upload_id, &state)
            .await?;
        state.mark_completed(file.clone());
        self.sessions.remove(container_id, upload_id);
        drop(state);
        Ok(ChunkOutcome::Complete { file })
    }

    /// Reassemble a complete session into a blob and commit the file entry.
    ///
    /// Called with the session mutex held. On any failure the session is
    /// left intact (slots still filled) so a client retry of the same
    /// chunk re-triggers reassembly.
    async fn finish_upload(
        &self,
        container_id: &ContainerId,
        upload_id: &UploadId,
        state: &crate::session::ChunkSession,
    ) -> Result<FileEntry, GatewayError> {
        let data = state.assemble();
        let size = data.len() as u64;
        if size != state.meta.declared_size {
            warn!(
                declared = state.meta.declared_size,
                actual = size,
                "assembled size disagrees with declared size; using actual"
            );
        }

        let hint = BlobHint::new(state.meta.filename.clone(), state.meta.mime_type.clone());
        let blob = self
            .blobs
            .put(data, &hint)
            .await
            .map_err(|e| GatewayError::StorageWrite(e.to_string()))?;

        let file = FileEntry {
            id: FileId::generate(),
            original_name: state.meta.filename.clone(),
            mime_type: state.meta.mime_type.clone(),
            size,
            storage_ref: blob.to_string(),
            created_at: Utc::now(),
        };

        let guard = self
            .locks
            .acquire(container_id, self.config.lock_ttl, self.config.lock_timeout)
            .await
            .map_err(GatewayError::from)?;
        let appended = self.append_file(container_id, file.clone()).await;
        if let Err(e) = guard.release().await {
            debug!(error = %e, "container lock release failed");
        }

        match appended {
            Ok(container_name) => {
                self.metrics.increment_files_assembled();
                info!(
                    file = %file.id,
                    size,
                    upload = %upload_id,
                    "upload reassembled and committed"
                );
                self.spawn_notification(FileAddedEvent {
                    container_id: container_id.clone(),
                    container_name,
                    file: file.clone(),
                    occurred_at: Utc::now(),
                });
                Ok(file)
            }
            Err(e) => {
                // The blob is already durable but the record append failed;
                // reclaim it so nothing leaks, then let the caller retry.
                if let Err(del) = self.blobs.delete(&blob).await {
                    self.metrics.increment_orphaned_blobs();
                    warn!(%blob, error = %del, "orphaned blob after failed append");
                }
                if matches!(e, GatewayError::NotFound(_)) {
                    self.sessions.remove_container(container_id);
                }
                Err(e)
            }
        }
    }

    /// Append a committed file to its container record (container lock
    /// held). Returns the container name for the notification event.
    async fn append_file(
        &self,
        container_id: &ContainerId,
        file: FileEntry,
    ) -> Result<String, GatewayError> {
        let Some(mut container) = self.registry.get(container_id).await? else {
            return Err(GatewayError::NotFound(container_id.to_string()));
        };
        container.files.push(file);
        self.registry.update(&container).await?;
        Ok(container.name)
    }

    /// Remove one file from a container.
    ///
    /// Requires a write-capable role. The record update always completes;
    /// blob deletion is best-effort with the failure logged.
    #[instrument(
        name = "gateway.delete_file",
        skip_all,
        fields(container = %container_id, file = %file_id)
    )]
    pub async fn delete_file(
        &self,
        container_id: &ContainerId,
        file_id: &FileId,
        role: Role,
    ) -> Result<(), GatewayError> {
        let guard = self
            .locks
            .acquire(container_id, self.config.lock_ttl, self.config.lock_timeout)
            .await
            .map_err(GatewayError::from)?;
        let removed = self.remove_file_locked(container_id, file_id, role).await;
        if let Err(e) = guard.release().await {
            debug!(error = %e, "container lock release failed");
        }
        let entry = removed?;

        let blob = BlobRef::new(entry.storage_ref.clone());
        match self.blobs.delete(&blob).await {
            Ok(_) => {}
            Err(e) => {
                self.metrics.increment_orphaned_blobs();
                warn!(%blob, error = %e, "blob delete failed; orphan left behind");
            }
        }
        self.metrics.increment_files_deleted();
        Ok(())
    }

    async fn remove_file_locked(
        &self,
        container_id: &ContainerId,
        file_id: &FileId,
        role: Role,
    ) -> Result<FileEntry, GatewayError> {
        let Some(mut container) = self.registry.get(container_id).await? else {
            return Err(GatewayError::NotFound(container_id.to_string()));
        };
        if !role.can_write(container.access_mode) {
            return Err(GatewayError::Forbidden(format!(
                "{role:?} is read-only on this container"
            )));
        }
        let Some(entry) = container.remove_file(file_id) else {
            return Err(GatewayError::NotFound(file_id.to_string()));
        };
        self.registry.update(&container).await?;
        Ok(entry)
    }

    /// Case-insensitive substring search over live container names.
    pub async fn search(&self, query: &str) -> Result<Vec<ContainerSummary>, GatewayError> {
        Ok(self.registry.search(query, self.config.max_results).await?)
    }

    /// The most recently created containers, newest-first.
    pub async fn list_recent(
        &self,
        limit: usize,
    ) -> Result<Vec<ContainerSummary>, GatewayError> {
        let capped = limit.min(self.config.max_results);
        Ok(self.registry.list_recent(capped).await?)
    }

    fn spawn_notification(&self, event: FileAddedEvent) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        let metrics = Arc::clone(&self.metrics);
        self.notify_tracker.spawn(async move {
            if let Err(e) = notifier.file_added(&event).await {
                metrics.increment_notify_failures();
                warn!(container = %event.container_id, error = %e, "file-added notification failed");
            }
        });
    }

    /// Wait for in-flight notification tasks to finish (shutdown path).
    pub async fn drain_notifications(&self) {
        self.notify_tracker.close();
        self.notify_tracker.wait().await;
    }
}
