use async_trait::async_trait;
use dashmap::DashMap;

use lockbox_core::{Container, ContainerId, ContainerSummary};
use lockbox_registry::error::RegistryError;
use lockbox_registry::store::ContainerRegistry;

/// In-memory [`ContainerRegistry`] backed by [`DashMap`]s.
///
/// Holds one map of records keyed by container id and a secondary index of
/// lowercased names, claimed through the entry API so concurrent inserts of
/// the same name race safely. Suitable for tests and single-process
/// deployments; a durable backend implements the same trait.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    records: DashMap<String, Container>,
    names: DashMap<String, String>,
}

impl MemoryRegistry {
    /// Create a new, empty in-memory registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn name_key(name: &str) -> String {
        name.to_lowercase()
    }
}

#[async_trait]
impl ContainerRegistry for MemoryRegistry {
    async fn insert(&self, container: Container) -> Result<(), RegistryError> {
        let name_key = Self::name_key(&container.name);

        // Claim the name first; the entry API makes the claim atomic with
        // respect to concurrent inserts of the same name.
        match self.names.entry(name_key) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(RegistryError::NameConflict(container.name));
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(container.id.as_str().to_owned());
            }
        }

        self.records
            .insert(container.id.as_str().to_owned(), container);
        Ok(())
    }

    async fn get(&self, id: &ContainerId) -> Result<Option<Container>, RegistryError> {
        Ok(self.records.get(id.as_str()).map(|r| r.clone()))
    }

    async fn update(&self, container: &Container) -> Result<(), RegistryError> {
        // Names are immutable after creation, so the name index needs no
        // maintenance here.
        let Some(mut record) = self.records.get_mut(container.id.as_str()) else {
            return Err(RegistryError::NotFound(container.id.to_string()));
        };
        *record = container.clone();
        Ok(())
    }

    async fn remove(&self, id: &ContainerId) -> Result<bool, RegistryError> {
        let Some((_, removed)) = self.records.remove(id.as_str()) else {
            return Ok(false);
        };
        // Release the name claim only if it still points at this record.
        self.names
            .remove_if(&Self::name_key(&removed.name), |_, owner| {
                owner == id.as_str()
            });
        Ok(true)
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ContainerSummary>, RegistryError> {
        let needle = query.to_lowercase();
        let mut hits: Vec<ContainerSummary> = self
            .records
            .iter()
            .filter(|r| r.name.to_lowercase().contains(&needle))
            .map(|r| r.summary())
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ContainerSummary>, RegistryError> {
        self.search("", limit).await
    }
}

#[cfg(test)]
mod tests {
    use lockbox_registry::testing::{run_registry_conformance_tests, test_container};

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let registry = MemoryRegistry::new();
        run_registry_conformance_tests(&registry)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test]
    async fn concurrent_inserts_of_same_name_elect_one_winner() {
        let registry = std::sync::Arc::new(MemoryRegistry::new());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = std::sync::Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.insert(test_container("Contested", 0)).await
            }));
        }

        let mut wins = 0;
        let mut conflicts = 0;
        for h in handles {
            match h.await.expect("task should not panic") {
                Ok(()) => wins += 1,
                Err(RegistryError::NameConflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(wins, 1, "exactly one insert should win the name");
        assert_eq!(conflicts, 15);
    }

    #[tokio::test]
    async fn remove_releases_name_for_reuse() {
        let registry = MemoryRegistry::new();
        let first = test_container("transient", 0);
        let id = first.id.clone();

        registry.insert(first).await.unwrap();
        assert!(registry.remove(&id).await.unwrap());
        registry
            .insert(test_container("TRANSIENT", 0))
            .await
            .expect("name should be free again");
    }

    #[tokio::test]
    async fn search_is_bounded_and_ordered() {
        let registry = MemoryRegistry::new();
        for (name, age) in [("alpha-box", 30), ("beta-box", 20), ("alpha-crate", 10)] {
            registry.insert(test_container(name, age)).await.unwrap();
        }

        let hits = registry.search("alpha", 10).await.unwrap();
        let names: Vec<_> = hits.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["alpha-crate", "alpha-box"]);

        let recent = registry.list_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].name, "alpha-crate");
    }
}
