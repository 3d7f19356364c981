use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use lockbox_core::ContainerId;
use lockbox_registry::error::RegistryError;
use lockbox_registry::lock::{ContainerLock, LockGuard};

/// How long a blocked `acquire` waits between attempts.
const ACQUIRE_BACKOFF: Duration = Duration::from_millis(10);

/// A granted lease on one container's mutation lock.
#[derive(Debug)]
struct Lease {
    holder: u64,
    deadline: Instant,
}

impl Lease {
    fn lapsed(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// In-memory [`ContainerLock`].
///
/// One lease per container id. A lapsed lease is evicted by whichever
/// acquire attempt trips over it next, so a holder that crashed without
/// releasing stalls its container for at most the lease TTL. Holder
/// tokens are process-unique; release and extend are no-ops for a guard
/// whose lease was already lost.
#[derive(Debug, Default)]
pub struct MemoryContainerLock {
    leases: Arc<DashMap<String, Lease>>,
    next_holder: AtomicU64,
}

impl MemoryContainerLock {
    /// Create a new in-memory lock manager.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContainerLock for MemoryContainerLock {
    async fn try_acquire(
        &self,
        id: &ContainerId,
        ttl: Duration,
    ) -> Result<Option<Box<dyn LockGuard>>, RegistryError> {
        self.leases.remove_if(id.as_str(), |_, lease| lease.lapsed());

        let holder = self.next_holder.fetch_add(1, Ordering::Relaxed);
        match self.leases.entry(id.as_str().to_owned()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(None),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Lease {
                    holder,
                    deadline: Instant::now() + ttl,
                });
                Ok(Some(Box::new(MemoryLockGuard {
                    leases: Arc::clone(&self.leases),
                    container: id.as_str().to_owned(),
                    holder,
                })))
            }
        }
    }

    async fn acquire(
        &self,
        id: &ContainerId,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Box<dyn LockGuard>, RegistryError> {
        let give_up = Instant::now() + timeout;
        loop {
            if let Some(guard) = self.try_acquire(id, ttl).await? {
                return Ok(guard);
            }
            if Instant::now() >= give_up {
                return Err(RegistryError::Timeout(timeout));
            }
            tokio::time::sleep(ACQUIRE_BACKOFF).await;
        }
    }
}

/// Guard for a lease granted by [`MemoryContainerLock`].
#[derive(Debug)]
pub struct MemoryLockGuard {
    leases: Arc<DashMap<String, Lease>>,
    container: String,
    holder: u64,
}

impl MemoryLockGuard {
    /// The lease currently backing this guard, if it is still ours.
    fn lease_is_ours(&self, lease: &Lease) -> bool {
        lease.holder == self.holder && !lease.lapsed()
    }
}

#[async_trait]
impl LockGuard for MemoryLockGuard {
    async fn extend(&self, duration: Duration) -> Result<(), RegistryError> {
        let Some(mut lease) = self.leases.get_mut(&self.container) else {
            return Err(RegistryError::LockExpired(self.container.clone()));
        };
        if !self.lease_is_ours(&lease) {
            return Err(RegistryError::LockExpired(self.container.clone()));
        }
        lease.deadline = Instant::now() + duration;
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<(), RegistryError> {
        // A lapsed lease may already belong to someone else; only remove
        // our own.
        self.leases
            .remove_if(&self.container, |_, lease| lease.holder == self.holder);
        Ok(())
    }

    async fn is_held(&self) -> Result<bool, RegistryError> {
        Ok(self
            .leases
            .get(&self.container)
            .is_some_and(|lease| self.lease_is_ours(&lease)))
    }
}

#[cfg(test)]
mod tests {
    use lockbox_registry::testing::run_lock_conformance_tests;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let lock = MemoryContainerLock::new();
        run_lock_conformance_tests(&lock)
            .await
            .expect("lock conformance tests should pass");
    }

    #[tokio::test(start_paused = true)]
    async fn lapsed_lease_frees_the_container() {
        let lock = MemoryContainerLock::new();
        let id = ContainerId::new("expire-lock");

        let stale = lock
            .try_acquire(&id, Duration::from_secs(2))
            .await
            .unwrap()
            .expect("uncontested acquire");
        assert!(stale.is_held().await.unwrap());

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(!stale.is_held().await.unwrap());

        let fresh = lock.try_acquire(&id, Duration::from_secs(10)).await.unwrap();
        assert!(fresh.is_some(), "TTL expiry should free the container");

        // The stale guard's release must not evict the fresh holder.
        stale.release().await.unwrap();
        assert!(fresh.unwrap().is_held().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_gives_up_after_timeout() {
        let lock = MemoryContainerLock::new();
        let id = ContainerId::new("timeout-lock");

        let _held = lock
            .try_acquire(&id, Duration::from_secs(60))
            .await
            .unwrap()
            .expect("uncontested acquire");

        let blocked = lock
            .acquire(&id, Duration::from_secs(5), Duration::from_secs(1))
            .await;
        assert!(matches!(blocked, Err(RegistryError::Timeout(_))));
    }

    #[tokio::test]
    async fn contended_holders_take_turns() {
        let lock = Arc::new(MemoryContainerLock::new());
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let id = ContainerId::new("contended");

        let mut workers = Vec::new();
        for worker in 0..10u32 {
            let lock = Arc::clone(&lock);
            let order = Arc::clone(&order);
            let id = id.clone();
            workers.push(tokio::spawn(async move {
                let guard = lock
                    .acquire(&id, Duration::from_millis(200), Duration::from_secs(5))
                    .await
                    .expect("every worker should eventually hold the lock");
                order.lock().unwrap().push(worker);
                guard.release().await.expect("release should succeed");
            }));
        }
        for w in workers {
            w.await.expect("worker should not panic");
        }

        let mut seen = order.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }
}
