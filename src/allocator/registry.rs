//! Registry of named allocators.

use super::{Allocator, SystemAllocator};
use crate::defaults::SYSTEM_MEMORY_TYPE;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Named allocators plus a default.
///
/// The registry always knows the system allocator under
/// [`SYSTEM_MEMORY_TYPE`]; it is also the initial default. A process-wide
/// instance is reachable through [`global`] and the free functions in this
/// module; standalone registries can be created for tests or embedding.
pub struct AllocatorRegistry {
    /// Allocators indexed by name.
    allocators: RwLock<HashMap<String, Arc<dyn Allocator>>>,
    /// Allocator used when none is named.
    default: RwLock<Arc<dyn Allocator>>,
}

impl AllocatorRegistry {
    /// Create a registry holding only the system allocator.
    pub fn new() -> Self {
        let system = system_allocator();
        let mut allocators = HashMap::new();
        allocators.insert(SYSTEM_MEMORY_TYPE.to_string(), Arc::clone(&system));

        Self {
            allocators: RwLock::new(allocators),
            default: RwLock::new(system),
        }
    }

    /// Register `allocator` under `name`.
    ///
    /// Returns the allocator previously registered under that name.
    pub fn register(
        &self,
        name: impl Into<String>,
        allocator: Arc<dyn Allocator>,
    ) -> Option<Arc<dyn Allocator>> {
        let name = name.into();
        tracing::debug!(name = %name, mem_type = allocator.mem_type(), "allocator registered");
        self.allocators
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, allocator)
    }

    /// Look up an allocator by name; `None` returns the default.
    pub fn find(&self, name: Option<&str>) -> Option<Arc<dyn Allocator>> {
        match name {
            None => Some(self.default_allocator()),
            Some(name) => self
                .allocators
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(name)
                .cloned(),
        }
    }

    /// Make `allocator` the default.
    pub fn set_default(&self, allocator: Arc<dyn Allocator>) {
        tracing::debug!(mem_type = allocator.mem_type(), "default allocator changed");
        *self.default.write().unwrap_or_else(PoisonError::into_inner) = allocator;
    }

    /// The current default allocator.
    pub fn default_allocator(&self) -> Arc<dyn Allocator> {
        Arc::clone(&self.default.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Names of all registered allocators, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .allocators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl Default for AllocatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AllocatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllocatorRegistry")
            .field("allocators", &self.names())
            .field("default", &self.default_allocator().mem_type())
            .finish()
    }
}

/// The shared system allocator instance.
///
/// Wrapped blocks always report this allocator, whatever the default is.
pub fn system_allocator() -> Arc<dyn Allocator> {
    static SYSTEM: OnceLock<Arc<dyn Allocator>> = OnceLock::new();
    Arc::clone(SYSTEM.get_or_init(|| Arc::new(SystemAllocator)))
}

/// The process-wide registry.
pub fn global() -> &'static AllocatorRegistry {
    static REGISTRY: OnceLock<AllocatorRegistry> = OnceLock::new();
    REGISTRY.get_or_init(AllocatorRegistry::new)
}

/// Register an allocator in the process-wide registry.
pub fn register(name: impl Into<String>, allocator: Arc<dyn Allocator>) -> Option<Arc<dyn Allocator>> {
    global().register(name, allocator)
}

/// Find an allocator in the process-wide registry; `None` returns the default.
pub fn find(name: Option<&str>) -> Option<Arc<dyn Allocator>> {
    global().find(name)
}

/// Set the process-wide default allocator.
pub fn set_default(allocator: Arc<dyn Allocator>) {
    global().set_default(allocator)
}

/// The process-wide default allocator.
pub fn default_allocator() -> Arc<dyn Allocator> {
    global().default_allocator()
}
