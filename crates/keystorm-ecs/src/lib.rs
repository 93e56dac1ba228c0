//! Keystorm ECS -- map-backed Entity Component System with a spatial grid.
//!
//! This crate provides the ECS substrate for the Keystorm engine: a monotonic
//! entity allocator, per-type component stores with snapshot iteration, a
//! grid spatial index with transactional updates, a keyed resource registry,
//! and a store-intersection query builder.
//!
//! The concurrency contract is single-writer / many-reader: the simulation
//! thread owns all mutation; the render thread and diagnostic threads read
//! concurrently through value copies and handle-list snapshots.
//!
//! # Quick Start
//!
//! ```
//! use keystorm_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Glyph(char);
//!
//! let world = World::new(80, 24);
//! world.register_component::<Glyph>("glyph");
//!
//! let e = world.create_entity();
//! world.store::<Glyph>().insert(e, Glyph('k'));
//! world.spatial().spawn(e, 10, 5);
//!
//! assert_eq!(world.spatial().get_entity_at(10, 5), e);
//! assert_eq!(world.store::<Glyph>().get(e), Some(Glyph('k')));
//! ```

#![deny(unsafe_code)]

pub mod entity;
pub mod query;
pub mod resource;
pub mod spatial;
pub mod store;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
///
/// Simulation-path misuse (operating on a dead entity) is a silent no-op and
/// never surfaces here; these errors cover structural probes only. The
/// panicking accessors (`World::store`, `ResourceRegistry::must_get`) are the
/// startup-path equivalents.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// A required singleton resource was never installed.
    #[error("missing resource: {name}")]
    MissingResource {
        /// Type name of the missing resource.
        name: String,
    },

    /// A component type was referenced that has not been registered.
    #[error("component type not registered: {name}")]
    UnknownComponent {
        /// Type name of the unregistered component.
        name: String,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::entity::{EntityAllocator, EntityId};
    pub use crate::query::QueryBuilder;
    pub use crate::resource::ResourceRegistry;
    pub use crate::spatial::{Position, SpatialIndex, SpatialTransaction};
    pub use crate::store::{AnyStore, Component, ComponentStore};
    pub use crate::world::World;
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
