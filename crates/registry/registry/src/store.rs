use async_trait::async_trait;

use lockbox_core::{Container, ContainerId, ContainerSummary};

use crate::error::RegistryError;

/// Trait for persisting container records.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
/// The registry owns the name-uniqueness invariant: at most one live
/// container per name, compared case-insensitively. Records of destroyed
/// containers are removed outright, so every stored record is live.
#[async_trait]
pub trait ContainerRegistry: Send + Sync {
    /// Insert a freshly created container.
    ///
    /// Fails with [`RegistryError::NameConflict`] when a live container
    /// already claims the same name case-insensitively. The name claim and
    /// the record insert are atomic with respect to concurrent inserts.
    async fn insert(&self, container: Container) -> Result<(), RegistryError>;

    /// Fetch a container by id. Returns `None` if no live record exists.
    async fn get(&self, id: &ContainerId) -> Result<Option<Container>, RegistryError>;

    /// Overwrite an existing record.
    ///
    /// Fails with [`RegistryError::NotFound`] when the record is gone;
    /// callers serialize updates per container through a [`ContainerLock`],
    /// so a missing record means the container was destroyed.
    ///
    /// [`ContainerLock`]: crate::lock::ContainerLock
    async fn update(&self, container: &Container) -> Result<(), RegistryError>;

    /// Remove a record and release its name claim. Returns `true` if the
    /// record existed.
    async fn remove(&self, id: &ContainerId) -> Result<bool, RegistryError>;

    /// Case-insensitive substring search over live container names.
    ///
    /// Results are newest-first and capped at `limit`. An empty query
    /// matches every container.
    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ContainerSummary>, RegistryError>;

    /// The most recently created containers, newest-first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<ContainerSummary>, RegistryError>;
}
