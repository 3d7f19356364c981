use std::time::Duration;

use async_trait::async_trait;

use lockbox_core::ContainerId;

use crate::error::RegistryError;

/// A held per-container lock. Dropping without explicit release is allowed
/// (the lock will expire after its TTL), but explicit release is preferred.
#[async_trait]
pub trait LockGuard: Send + Sync {
    /// Extend the lock's TTL.
    async fn extend(&self, duration: Duration) -> Result<(), RegistryError>;

    /// Explicitly release the lock.
    async fn release(self: Box<Self>) -> Result<(), RegistryError>;

    /// Check if the lock is still held by this guard.
    async fn is_held(&self) -> Result<bool, RegistryError>;
}

/// Trait for acquiring per-container mutation locks.
///
/// The container record is the unit of mutual exclusion: every write to its
/// view counter, file list, or deletion flag happens under this lock.
/// Distinct containers must never contend with each other.
#[async_trait]
pub trait ContainerLock: Send + Sync {
    /// Try to acquire the lock for one container with the given TTL.
    /// Returns `None` if the lock is already held by another owner.
    async fn try_acquire(
        &self,
        id: &ContainerId,
        ttl: Duration,
    ) -> Result<Option<Box<dyn LockGuard>>, RegistryError>;

    /// Acquire the lock, waiting up to `timeout` for it to become available.
    async fn acquire(
        &self,
        id: &ContainerId,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Box<dyn LockGuard>, RegistryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify object safety of both traits.
    fn _assert_dyn_lock_guard(_: &dyn LockGuard) {}
    fn _assert_dyn_container_lock(_: &dyn ContainerLock) {}
}
