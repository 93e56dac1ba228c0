//! The world: allocator, store registry, spatial index, resources.
//!
//! [`World`] is owned by the simulation thread. All methods take `&self`;
//! interior locks inside the stores, the spatial index, and the registries
//! make concurrent reads from the render thread safe. The simulation thread
//! is the only writer.
//!
//! Component stores are registered once at startup under a debug name.
//! Registering twice, or asking for an unregistered store, is structural
//! misuse and panics; the `try_` variants return [`EcsError`] instead for
//! callers that want to probe.

use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::entity::{EntityAllocator, EntityId};
use crate::query::QueryBuilder;
use crate::resource::ResourceRegistry;
use crate::spatial::{Position, SpatialIndex};
use crate::store::{AnyStore, Component, ComponentStore};
use crate::EcsError;

// ---------------------------------------------------------------------------
// StoreRegistry
// ---------------------------------------------------------------------------

struct StoreRegistry {
    /// Typed handles for downcast access, keyed by component type.
    typed: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    /// Erased handles in registration order, for broadcast discard/clear and
    /// the debug overlay.
    erased: Vec<(String, Arc<dyn AnyStore>)>,
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The ECS world.
pub struct World {
    allocator: RwLock<EntityAllocator>,
    stores: RwLock<StoreRegistry>,
    spatial: SpatialIndex,
    resources: ResourceRegistry,
}

impl World {
    /// Create a world with a `width x height` spatial grid.
    ///
    /// The canonical [`Position`] store owned by the spatial index is
    /// registered automatically under the name `"position"`.
    pub fn new(width: i32, height: i32) -> Self {
        let spatial = SpatialIndex::new(width, height);
        let positions = spatial.positions();
        let world = Self {
            allocator: RwLock::new(EntityAllocator::new()),
            stores: RwLock::new(StoreRegistry {
                typed: HashMap::new(),
                erased: Vec::new(),
            }),
            spatial,
            resources: ResourceRegistry::new(),
        };
        world.register_store("position", positions);
        world
    }

    // -- store registry ------------------------------------------------------

    /// Register a component store for `T` under a debug name.
    ///
    /// Returns the shared store handle.
    ///
    /// # Panics
    ///
    /// Panics if `T` or `name` is already registered.
    pub fn register_component<T: Component>(&self, name: &str) -> Arc<ComponentStore<T>> {
        let store = Arc::new(ComponentStore::<T>::new());
        self.register_store(name, Arc::clone(&store));
        store
    }

    fn register_store<T: Component>(&self, name: &str, store: Arc<ComponentStore<T>>) {
        let mut registry = self.stores.write();
        assert!(
            !registry.typed.contains_key(&TypeId::of::<T>()),
            "component type already registered: {}",
            std::any::type_name::<T>()
        );
        assert!(
            !registry.erased.iter().any(|(n, _)| n == name),
            "duplicate component store name: {name:?}"
        );
        registry.typed.insert(
            TypeId::of::<T>(),
            Arc::clone(&store) as Arc<dyn Any + Send + Sync>,
        );
        registry
            .erased
            .push((name.to_owned(), store as Arc<dyn AnyStore>));
        tracing::debug!(component = name, "registered component store");
    }

    /// Shared handle to the store for `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` was never registered.
    pub fn store<T: Component>(&self) -> Arc<ComponentStore<T>> {
        self.try_store::<T>().unwrap_or_else(|err| panic!("{err}"))
    }

    /// Shared handle to the store for `T`, or [`EcsError::UnknownComponent`].
    pub fn try_store<T: Component>(&self) -> Result<Arc<ComponentStore<T>>, EcsError> {
        let registry = self.stores.read();
        registry
            .typed
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|arc| arc.downcast::<ComponentStore<T>>().ok())
            .ok_or_else(|| EcsError::UnknownComponent {
                name: std::any::type_name::<T>().to_owned(),
            })
    }

    /// `(name, count)` for every registered store, in registration order.
    pub fn store_counts(&self) -> Vec<(String, usize)> {
        self.stores
            .read()
            .erased
            .iter()
            .map(|(name, store)| (name.clone(), store.count()))
            .collect()
    }

    // -- entities ------------------------------------------------------------

    /// Allocate a fresh entity handle.
    pub fn create_entity(&self) -> EntityId {
        self.allocator.write().allocate()
    }

    /// Destroy an entity: drop it from the live set, the spatial index, and
    /// every component store. Destroying an unknown or dead handle is a no-op.
    pub fn destroy_entity(&self, entity: EntityId) {
        if !self.allocator.write().deallocate(entity) {
            return;
        }
        self.spatial.despawn(entity);
        for (_, store) in &self.stores.read().erased {
            store.discard(entity);
        }
    }

    /// Whether `entity` is currently alive.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.allocator.read().is_alive(entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.allocator.read().alive_count()
    }

    /// Snapshot of all live handles.
    pub fn live_entities(&self) -> Vec<EntityId> {
        self.allocator.read().live_handles()
    }

    /// Destroy every entity. The handle counter is preserved: handles from
    /// before the clear stay stale forever.
    pub fn clear(&self) {
        self.allocator.write().clear();
        self.spatial.clear();
        for (_, store) in &self.stores.read().erased {
            store.clear_all();
        }
        tracing::debug!("world cleared");
    }

    /// Full reset: [`clear`](Self::clear) plus rewinding the handle counter.
    pub fn reset(&self) {
        self.allocator.write().reset();
        self.spatial.clear();
        for (_, store) in &self.stores.read().erased {
            store.clear_all();
        }
        tracing::debug!("world reset");
    }

    // -- access --------------------------------------------------------------

    /// The spatial index.
    pub fn spatial(&self) -> &SpatialIndex {
        &self.spatial
    }

    /// The resource registry.
    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    /// Start a store-intersection query.
    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    /// Convenience: current grid cell of `entity`.
    pub fn position_of(&self, entity: EntityId) -> Option<Position> {
        self.spatial.position_of(entity)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
