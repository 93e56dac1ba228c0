//! Keyed singleton resources.
//!
//! The [`ResourceRegistry`] stores one value per Rust type: the simulation
//! clock, the game config, the status registry, the cursor descriptor. Values
//! are handed out as `Arc<T>` so long-lived holders (systems, the renderer)
//! share the singleton without lifetime plumbing.
//!
//! A missing required resource is structural misuse at startup --
//! [`must_get`](ResourceRegistry::must_get) panics rather than propagating an
//! error into the tick loop.

use parking_lot::RwLock;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// ResourceRegistry
// ---------------------------------------------------------------------------

/// Type-keyed registry of shared singletons.
pub struct ResourceRegistry {
    entries: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl ResourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Install `value` as the singleton for its type, replacing any previous
    /// value.
    pub fn insert<T: Send + Sync + 'static>(&self, value: T) {
        self.entries
            .write()
            .insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Shared handle to the singleton for `T`, if installed.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.entries
            .read()
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|arc| arc.downcast::<T>().ok())
    }

    /// Shared handle to the singleton for `T`.
    ///
    /// # Panics
    ///
    /// Panics with a missing-resource message if `T` was never installed.
    /// Required resources are installed at startup; hitting this after boot is
    /// a bug.
    pub fn must_get<T: Send + Sync + 'static>(&self) -> Arc<T> {
        self.get::<T>().unwrap_or_else(|| {
            panic!("missing resource: {}", type_name::<T>());
        })
    }

    /// Shared handle to the singleton for `T`, or
    /// [`EcsError::MissingResource`](crate::EcsError::MissingResource).
    pub fn try_get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, crate::EcsError> {
        self.get::<T>().ok_or_else(|| crate::EcsError::MissingResource {
            name: type_name::<T>().to_owned(),
        })
    }

    /// Remove the singleton for `T`, returning whether one was installed.
    pub fn remove<T: Send + Sync + 'static>(&self) -> bool {
        self.entries.write().remove(&TypeId::of::<T>()).is_some()
    }

    /// Whether a singleton for `T` is installed.
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.entries.read().contains_key(&TypeId::of::<T>())
    }

    /// Number of installed resources.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
