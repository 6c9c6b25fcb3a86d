//! Name-keyed and catalog-keyed builder registries.
//!
//! Per `SPEC_FULL.md` §4.3, this registry is an explicitly constructed value
//! rather than a process-wide singleton: tests build a fresh
//! `CoordinatorRegistry` instead of clearing a shared global, so the
//! source's "clear non-default builders" / "clear all" test affordances are
//! not carried forward.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::coordinator::{CommitCoordinatorClient, InMemoryCommitCoordinatorClient};
use crate::error::RegistryError;

/// Opaque context handed to catalog-keyed builders; carries whatever the
/// embedding application needs to resolve a coordinator for a given catalog.
/// The catalog name is passed separately to the builder.
#[derive(Debug, Clone, Default)]
pub struct CatalogContext {
    pub options: HashMap<String, String>,
}

/// Produces a coordinator client from a name-registered configuration map.
pub trait CommitCoordinatorBuilder: fmt::Debug + Send + Sync {
    fn build(
        &self,
        conf: &HashMap<String, String>,
    ) -> Result<Arc<dyn CommitCoordinatorClient>, RegistryError>;
}

/// Produces a coordinator client for a named catalog.
pub trait CatalogCommitCoordinatorBuilder: fmt::Debug + Send + Sync {
    fn build(
        &self,
        context: &CatalogContext,
        catalog_name: &str,
    ) -> Result<Arc<dyn CommitCoordinatorClient>, RegistryError>;
}

#[derive(Debug)]
struct InMemoryBuilder;

impl CommitCoordinatorBuilder for InMemoryBuilder {
    fn build(
        &self,
        _conf: &HashMap<String, String>,
    ) -> Result<Arc<dyn CommitCoordinatorClient>, RegistryError> {
        Ok(Arc::new(InMemoryCommitCoordinatorClient::default()))
    }
}

/// Name/catalog-keyed collection of coordinator builders. Registration and
/// lookup for each keyspace are serialized under their own mutex.
pub struct CoordinatorRegistry {
    by_name: Mutex<HashMap<String, Arc<dyn CommitCoordinatorBuilder>>>,
    by_catalog: Mutex<HashMap<String, Arc<dyn CatalogCommitCoordinatorBuilder>>>,
}

impl fmt::Debug for CoordinatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatorRegistry").finish_non_exhaustive()
    }
}

/// Name under which the built-in in-memory builder is seeded.
pub const IN_MEMORY_BUILDER_NAME: &str = "in-memory";

impl Default for CoordinatorRegistry {
    /// Seeds the registry with the `"in-memory"` builder, the only concrete
    /// client this crate ships.
    fn default() -> Self {
        let registry = Self::empty();
        registry
            .register(IN_MEMORY_BUILDER_NAME, Arc::new(InMemoryBuilder))
            .expect("seeding the in-memory builder cannot fail on a fresh registry");
        registry
    }
}

impl CoordinatorRegistry {
    /// A registry with no seeded entries at all, for tests that want full
    /// control over what is registered.
    pub fn empty() -> Self {
        Self {
            by_name: Mutex::new(HashMap::new()),
            by_catalog: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(
        &self,
        name: impl Into<String>,
        builder: Arc<dyn CommitCoordinatorBuilder>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let mut guard = self.by_name.lock().expect("registry mutex poisoned");
        if guard.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        guard.insert(name, builder);
        Ok(())
    }

    pub fn get(
        &self,
        name: &str,
        conf: &HashMap<String, String>,
    ) -> Result<Arc<dyn CommitCoordinatorClient>, RegistryError> {
        let builder = {
            let guard = self.by_name.lock().expect("registry mutex poisoned");
            guard
                .get(name)
                .cloned()
                .ok_or_else(|| RegistryError::UnknownCoordinator(name.to_string()))?
        };
        builder.build(conf).map_err(|err| {
            debug!(name, %err, "coordinator builder failed");
            err
        })
    }

    pub fn get_opt(
        &self,
        name: &str,
        conf: &HashMap<String, String>,
    ) -> Result<Option<Arc<dyn CommitCoordinatorClient>>, RegistryError> {
        match self.get(name, conf) {
            Ok(client) => Ok(Some(client)),
            Err(RegistryError::UnknownCoordinator(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn registered_names(&self) -> Vec<String> {
        let guard = self.by_name.lock().expect("registry mutex poisoned");
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn register_catalog(
        &self,
        catalog_name: impl Into<String>,
        builder: Arc<dyn CatalogCommitCoordinatorBuilder>,
    ) -> Result<(), RegistryError> {
        let catalog_name = catalog_name.into();
        let mut guard = self.by_catalog.lock().expect("registry mutex poisoned");
        if guard.contains_key(&catalog_name) {
            return Err(RegistryError::AlreadyRegistered(catalog_name));
        }
        guard.insert(catalog_name, builder);
        Ok(())
    }

    pub fn get_catalog(
        &self,
        catalog_name: &str,
        context: &CatalogContext,
    ) -> Result<Arc<dyn CommitCoordinatorClient>, RegistryError> {
        let builder = {
            let guard = self.by_catalog.lock().expect("registry mutex poisoned");
            guard
                .get(catalog_name)
                .cloned()
                .ok_or_else(|| RegistryError::UnknownCoordinator(catalog_name.to_string()))?
        };
        builder.build(context, catalog_name)
    }

    pub fn get_catalog_opt(
        &self,
        catalog_name: &str,
        context: &CatalogContext,
    ) -> Result<Option<Arc<dyn CommitCoordinatorClient>>, RegistryError> {
        match self.get_catalog(catalog_name, context) {
            Ok(client) => Ok(Some(client)),
            Err(RegistryError::UnknownCoordinator(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn registered_catalog_names(&self) -> Vec<String> {
        let guard = self.by_catalog.lock().expect("registry mutex poisoned");
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_seeds_the_in_memory_builder() {
        let registry = CoordinatorRegistry::default();
        assert_eq!(registry.registered_names(), vec![IN_MEMORY_BUILDER_NAME]);
        let client = registry.get(IN_MEMORY_BUILDER_NAME, &HashMap::new()).unwrap();
        assert!(client.is_equivalent_to(client.as_ref()));
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = CoordinatorRegistry::empty();
        registry
            .register("a", Arc::new(InMemoryBuilder))
            .unwrap();
        let err = registry.register("a", Arc::new(InMemoryBuilder)).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered(name) if name == "a"));
    }

    #[test]
    fn unknown_name_fails_get_but_not_get_opt() {
        let registry = CoordinatorRegistry::empty();
        assert!(matches!(
            registry.get("missing", &HashMap::new()),
            Err(RegistryError::UnknownCoordinator(_))
        ));
        assert_eq!(registry.get_opt("missing", &HashMap::new()).unwrap(), None);
    }

    #[test]
    fn isolated_registries_do_not_share_state() {
        let a = CoordinatorRegistry::empty();
        let b = CoordinatorRegistry::empty();
        a.register("x", Arc::new(InMemoryBuilder)).unwrap();
        assert!(b.register("x", Arc::new(InMemoryBuilder)).is_ok());
    }
}
