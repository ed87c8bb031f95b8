//! Database handles and the registry that resolves them by name
//!
//! The registry is owned by the host; the export path only reads a handle's
//! name and on-disk location.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A named data store and, if it has one, its on-disk location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseHandle {
    name: String,
    path: Option<PathBuf>,
}

impl DatabaseHandle {
    /// Create a handle. `path` is `None` for in-memory or internal stores.
    pub fn new(name: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }

    /// Handle for a store backed by a file.
    pub fn on_disk(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(name, Some(path.into()))
    }

    /// Handle for a store with no file behind it.
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    /// Database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// On-disk location, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Lookup of database handles by name.
pub trait DatabaseRegistry: Send + Sync {
    /// Resolve a database by name.
    fn get(&self, name: &str) -> Option<DatabaseHandle>;

    /// Names of all registered databases, sorted.
    fn names(&self) -> Vec<String>;
}

/// In-process registry backed by a sorted map.
///
/// Uses parking_lot::RwLock so a panicking writer cannot poison lookups.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    databases: RwLock<BTreeMap<String, DatabaseHandle>>,
}

impl StaticRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the given handles.
    pub fn with_databases(handles: impl IntoIterator<Item = DatabaseHandle>) -> Self {
        let registry = Self::new();
        for handle in handles {
            registry.register(handle);
        }
        registry
    }

    /// Add or replace a database. Returns the previous handle under that name.
    pub fn register(&self, handle: DatabaseHandle) -> Option<DatabaseHandle> {
        self.databases
            .write()
            .insert(handle.name().to_string(), handle)
    }

    /// Remove a database by name.
    pub fn unregister(&self, name: &str) -> Option<DatabaseHandle> {
        self.databases.write().remove(name)
    }
}

impl DatabaseRegistry for StaticRegistry {
    fn get(&self, name: &str) -> Option<DatabaseHandle> {
        self.databases.read().get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        self.databases.read().keys().cloned().collect()
    }
}
