//! Conformance test suites for registry backends.
//!
//! Call these from a backend's test module with a fresh instance. Every
//! backend must pass both suites; backend-specific behavior (TTL handling,
//! eviction) gets its own tests next to the implementation.

use std::time::Duration;

use chrono::{TimeDelta, Utc};

use lockbox_core::{AccessMode, Container, ContainerId};

use crate::error::RegistryError;
use crate::lock::ContainerLock;
use crate::store::ContainerRegistry;

/// Build a minimal live container for conformance tests.
///
/// `age_secs` pushes `created_at` into the past so ordering assertions can
/// distinguish records.
#[must_use]
pub fn test_container(name: &str, age_secs: i64) -> Container {
    let created = Utc::now() - TimeDelta::seconds(age_secs);
    Container {
        id: ContainerId::generate(),
        name: name.to_owned(),
        visitor_secret_hash: "$argon2id$v=19$m=19456,t=2,p=1$dGVzdA$unused".into(),
        admin_secret_hash: None,
        access_mode: AccessMode::Standard,
        max_views: 0,
        current_views: 0,
        files: Vec::new(),
        created_at: created,
        last_accessed_at: created,
        deleted: false,
    }
}

/// Run the full registry conformance test suite.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_registry_conformance_tests(
    registry: &dyn ContainerRegistry,
) -> Result<(), RegistryError> {
    test_get_missing(registry).await?;
    test_insert_and_get(registry).await?;
    test_name_conflict_case_insensitive(registry).await?;
    test_name_freed_after_remove(registry).await?;
    test_update(registry).await?;
    test_update_missing(registry).await?;
    test_remove(registry).await?;
    test_search(registry).await?;
    test_list_recent(registry).await?;
    Ok(())
}

async fn test_get_missing(registry: &dyn ContainerRegistry) -> Result<(), RegistryError> {
    let missing = ContainerId::new("no-such-container");
    let got = registry.get(&missing).await?;
    assert!(got.is_none(), "get on missing id should return None");
    Ok(())
}

async fn test_insert_and_get(registry: &dyn ContainerRegistry) -> Result<(), RegistryError> {
    let container = test_container("conformance-basic", 0);
    let id = container.id.clone();
    registry.insert(container).await?;

    let got = registry.get(&id).await?.expect("inserted record should load");
    assert_eq!(got.id, id);
    assert_eq!(got.name, "conformance-basic");
    Ok(())
}

async fn test_name_conflict_case_insensitive(
    registry: &dyn ContainerRegistry,
) -> Result<(), RegistryError> {
    registry.insert(test_container("Conformance-Name", 0)).await?;

    let clash = registry.insert(test_container("conformance-name", 0)).await;
    assert!(
        matches!(clash, Err(RegistryError::NameConflict(_))),
        "differently-cased duplicate should conflict"
    );
    Ok(())
}

async fn test_name_freed_after_remove(
    registry: &dyn ContainerRegistry,
) -> Result<(), RegistryError> {
    let first = test_container("conformance-reuse", 0);
    let id = first.id.clone();
    registry.insert(first).await?;
    registry.remove(&id).await?;

    registry
        .insert(test_container("Conformance-Reuse", 0))
        .await
        .expect("name should be reusable after removal");
    Ok(())
}

async fn test_update(registry: &dyn ContainerRegistry) -> Result<(), RegistryError> {
    let mut container = test_container("conformance-update", 0);
    let id = container.id.clone();
    registry.insert(container.clone()).await?;

    container.current_views = 7;
    registry.update(&container).await?;

    let got = registry.get(&id).await?.expect("record should exist");
    assert_eq!(got.current_views, 7, "update should overwrite the record");
    Ok(())
}

async fn test_update_missing(registry: &dyn ContainerRegistry) -> Result<(), RegistryError> {
    let ghost = test_container("conformance-ghost", 0);
    let result = registry.update(&ghost).await;
    assert!(
        matches!(result, Err(RegistryError::NotFound(_))),
        "update on missing record should fail with NotFound"
    );
    Ok(())
}

async fn test_remove(registry: &dyn ContainerRegistry) -> Result<(), RegistryError> {
    let container = test_container("conformance-remove", 0);
    let id = container.id.clone();
    registry.insert(container).await?;

    let existed = registry.remove(&id).await?;
    assert!(existed, "remove should return true for existing record");
    assert!(registry.get(&id).await?.is_none(), "record should be gone");

    let existed = registry.remove(&id).await?;
    assert!(!existed, "remove on missing record should return false");
    Ok(())
}

async fn test_search(registry: &dyn ContainerRegistry) -> Result<(), RegistryError> {
    registry.insert(test_container("holiday-album", 30)).await?;
    registry.insert(test_container("Holiday-Budget", 20)).await?;
    registry.insert(test_container("work-notes", 10)).await?;

    let hits = registry.search("HOLIDAY", 10).await?;
    let names: Vec<_> = hits.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        ["Holiday-Budget", "holiday-album"],
        "search should be case-insensitive and newest-first"
    );

    let capped = registry.search("holiday", 1).await?;
    assert_eq!(capped.len(), 1, "search should honor the result cap");
    assert_eq!(capped[0].name, "Holiday-Budget");

    let none = registry.search("zzz-no-match", 10).await?;
    assert!(none.is_empty());
    Ok(())
}

async fn test_list_recent(registry: &dyn ContainerRegistry) -> Result<(), RegistryError> {
    registry.insert(test_container("recent-old", 300)).await?;
    registry.insert(test_container("recent-mid", 200)).await?;
    registry.insert(test_container("recent-new", 100)).await?;

    let recent = registry.list_recent(2).await?;
    assert_eq!(recent.len(), 2, "list_recent should honor the cap");
    let names: Vec<_> = recent.iter().map(|s| s.name.as_str()).collect();
    // Other conformance containers are younger; just assert relative order.
    let pos_new = names.iter().position(|n| *n == "recent-new");
    let pos_mid = names.iter().position(|n| *n == "recent-mid");
    if let (Some(new), Some(mid)) = (pos_new, pos_mid) {
        assert!(new < mid, "newer container should come first");
    }
    Ok(())
}

/// Run the full per-container lock conformance test suite.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_lock_conformance_tests(lock: &dyn ContainerLock) -> Result<(), RegistryError> {
    test_try_acquire_and_release(lock).await?;
    test_try_acquire_contention(lock).await?;
    test_independent_containers(lock).await?;
    test_lock_extend(lock).await?;
    test_lock_is_held(lock).await?;
    Ok(())
}

async fn test_try_acquire_and_release(lock: &dyn ContainerLock) -> Result<(), RegistryError> {
    let id = ContainerId::new("lock-conf-1");
    let guard = lock.try_acquire(&id, Duration::from_secs(10)).await?;
    assert!(guard.is_some(), "should acquire uncontested lock");
    guard.unwrap().release().await?;
    Ok(())
}

async fn test_try_acquire_contention(lock: &dyn ContainerLock) -> Result<(), RegistryError> {
    let id = ContainerId::new("lock-conf-2");
    let held = lock
        .try_acquire(&id, Duration::from_secs(10))
        .await?
        .expect("first acquire should succeed");

    let second = lock.try_acquire(&id, Duration::from_secs(10)).await?;
    assert!(
        second.is_none(),
        "second acquire should fail while lock is held"
    );

    held.release().await?;
    Ok(())
}

async fn test_independent_containers(lock: &dyn ContainerLock) -> Result<(), RegistryError> {
    let a = ContainerId::new("lock-conf-3a");
    let b = ContainerId::new("lock-conf-3b");

    let guard_a = lock
        .try_acquire(&a, Duration::from_secs(10))
        .await?
        .expect("should acquire first container");
    let guard_b = lock.try_acquire(&b, Duration::from_secs(10)).await?;
    assert!(
        guard_b.is_some(),
        "distinct containers must not contend with each other"
    );

    guard_a.release().await?;
    guard_b.unwrap().release().await?;
    Ok(())
}

async fn test_lock_extend(lock: &dyn ContainerLock) -> Result<(), RegistryError> {
    let id = ContainerId::new("lock-conf-4");
    let guard = lock
        .try_acquire(&id, Duration::from_secs(5))
        .await?
        .expect("should acquire lock");

    guard.extend(Duration::from_secs(10)).await?;
    assert!(guard.is_held().await?, "lock should survive an extend");
    guard.release().await?;
    Ok(())
}

async fn test_lock_is_held(lock: &dyn ContainerLock) -> Result<(), RegistryError> {
    let id = ContainerId::new("lock-conf-5");
    let guard = lock
        .try_acquire(&id, Duration::from_secs(10))
        .await?
        .expect("should acquire lock");

    assert!(guard.is_held().await?, "lock should be held");
    guard.release().await?;
    Ok(())
}
