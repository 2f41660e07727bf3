// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

/// Errors that can occur when interacting with a Registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{registry} registration failed: An item with the name '{name}' is already registered.")]
    AlreadyExists { name: Arc<str>, registry: Arc<str> },

    #[error("{registry} registration failed: The name '{name}' is invalid (empty or whitespace-only names are not allowed).")]
    InvalidName { name: Arc<str>, registry: Arc<str> },
}

/// Validates that a name is not empty or whitespace-only.
pub fn validate_name(name: &str, registry_name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        Err(RegistryError::InvalidName {
            name: name.into(),
            registry: registry_name.into(),
        })
    } else {
        Ok(())
    }
}

/// Generic thread-safe registry for items of type T using DashMap.
///
/// This template can be used to create registries for any type T, including
/// factory closures. It provides thread-safe storage and retrieval with
/// customizable registry names.
#[derive(Clone)]
pub struct Registry<T> {
    inner: DashMap<Arc<str>, Arc<T>>,
    name: Arc<str>,
}

impl<T> Registry<T> {
    /// Create a new, empty registry with a given name.
    pub fn new(registry_name: impl Into<Arc<str>>) -> Self {
        Self {
            inner: DashMap::new(),
            name: registry_name.into(),
        }
    }

    /// Get the name of this registry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register an item with a given name. Returns Err if name already exists.
    pub fn register(&self, name: impl Into<Arc<str>>, item: Arc<T>) -> Result<(), RegistryError> {
        let name = name.into();

        validate_name(&name, &self.name)?;

        use dashmap::mapref::entry::Entry;
        match self.inner.entry(name) {
            Entry::Occupied(e) => Err(RegistryError::AlreadyExists {
                name: e.key().clone(),
                registry: self.name.clone(),
            }),
            Entry::Vacant(e) => {
                e.insert(item);
                Ok(())
            }
        }
    }

    /// Retrieve an item by name, if it exists.
    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.inner.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove an item by name. Returns the removed item if it existed.
    pub fn remove(&self, name: &str) -> Option<Arc<T>> {
        self.inner.remove(name).map(|(_, v)| v)
    }

    /// List all registered item names.
    pub fn list_names(&self) -> Vec<Arc<str>> {
        self.inner.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Check if an item with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Get the number of registered items.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Get an iterator over all entries in the registry.
    /// Returns an iterator of (name, item) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Arc<str>, Arc<T>)> + '_ {
        self.inner
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
    }

    /// Try to register an item, but don't fail if the name already exists.
    /// Returns Ok(true) if the item was registered, Ok(false) if the name
    /// already exists.
    pub fn try_register(
        &self,
        name: impl Into<Arc<str>>,
        item: Arc<T>,
    ) -> Result<bool, RegistryError> {
        match self.register(name, item) {
            Ok(()) => Ok(true),
            Err(RegistryError::AlreadyExists { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// A capability naming convention: the attribute that carries the capability
/// identity and the companion attribute that carries its version. The filter
/// parser consults the convention registry when recognizing capability
/// expressions and folding version ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convention {
    /// Attribute key holding the capability identity, e.g. `osgi.wiring.package`.
    pub namespace: Arc<str>,
    /// Companion attribute holding the version, e.g. `version` or `bundle-version`.
    pub version_attr: Arc<str>,
    /// Prefix used when rendering search queries, e.g. `p:` or `bsn:`.
    pub query_prefix: &'static str,
    /// Manifest header category the namespace corresponds to.
    pub category: &'static str,
}

impl Convention {
    fn new(
        namespace: &str,
        version_attr: &str,
        query_prefix: &'static str,
        category: &'static str,
    ) -> Convention {
        Convention {
            namespace: namespace.into(),
            version_attr: version_attr.into(),
            query_prefix,
            category,
        }
    }
}

/// Global registry instances.
pub mod instances {
    use super::*;

    lazy_static::lazy_static! {
        /// Global singleton instance of the capability conventions registry,
        /// populated with the OSGi wiring namespaces at startup.
        pub static ref CONVENTION_REGISTRY: Registry<Convention> = {
            let registry = Registry::new("CONVENTION_REGISTRY");
            let defaults = [
                Convention::new("osgi.wiring.package", "version", "p:", "Import-Package"),
                Convention::new("osgi.wiring.bundle", "bundle-version", "bsn:", "Require-Bundle"),
                Convention::new("osgi.wiring.host", "bundle-version", "bsn:", "Fragment-Host"),
                Convention::new("osgi.identity", "version", "bsn:", "ID"),
            ];
            for convention in defaults {
                let name = convention.namespace.clone();
                registry
                    .register(name, Arc::new(convention))
                    .expect("default conventions are distinct");
            }
            registry
        };
    }
}

/// Helper functions for convention registry operations.
pub mod conventions {
    use super::instances::CONVENTION_REGISTRY;
    use super::*;

    /// Retrieve the convention registered for a namespace attribute.
    pub fn find(namespace: &str) -> Option<Arc<Convention>> {
        CONVENTION_REGISTRY.get(namespace)
    }

    /// Check whether `key` is the version attribute of any registered
    /// convention.
    pub fn is_version_attr(key: &str) -> bool {
        CONVENTION_REGISTRY
            .iter()
            .any(|(_, c)| c.version_attr.as_ref() == key)
    }

    /// Register an additional convention under its namespace.
    pub fn register(convention: Convention) -> Result<(), RegistryError> {
        let name = convention.namespace.clone();
        CONVENTION_REGISTRY.register(name, Arc::new(convention))
    }

    /// List all registered namespaces.
    pub fn namespaces() -> Vec<Arc<str>> {
        CONVENTION_REGISTRY.list_names()
    }
}
