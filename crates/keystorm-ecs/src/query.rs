//! Entity queries over component store keysets.
//!
//! A query intersects the entity sets of one or more component stores at the
//! instant [`execute`](QueryBuilder::execute) is called. The result is a
//! snapshot: later store mutations are not reflected. Result order follows
//! the dense order of the first `with` store.

use std::collections::HashSet;

use crate::entity::EntityId;
use crate::store::Component;
use crate::world::World;

// ---------------------------------------------------------------------------
// QueryBuilder
// ---------------------------------------------------------------------------

/// Builder for store-intersection queries.
///
/// ```
/// # use keystorm_ecs::prelude::*;
/// # #[derive(Clone)] struct Glyph(char);
/// # #[derive(Clone)] struct Tagged;
/// let world = World::new(80, 24);
/// world.register_component::<Glyph>("glyph");
/// world.register_component::<Tagged>("tagged");
/// let e = world.create_entity();
/// world.store::<Glyph>().insert(e, Glyph('a'));
/// world.store::<Tagged>().insert(e, Tagged);
///
/// let hits = world.query().with::<Glyph>().with::<Tagged>().execute();
/// assert_eq!(hits, vec![e]);
/// ```
pub struct QueryBuilder<'w> {
    world: &'w World,
    /// First store's dense snapshot -- preserves iteration order.
    base: Option<Vec<EntityId>>,
    /// Keyset snapshots of every further `with` store.
    narrow: Vec<HashSet<EntityId>>,
    predicate: Option<Box<dyn Fn(EntityId) -> bool + 'w>>,
}

impl<'w> QueryBuilder<'w> {
    pub(crate) fn new(world: &'w World) -> Self {
        Self {
            world,
            base: None,
            narrow: Vec::new(),
            predicate: None,
        }
    }

    /// Require membership in the store for `T`. The store's keyset is
    /// snapshotted at this call.
    pub fn with<T: Component>(mut self) -> Self {
        let entities = self.world.store::<T>().entities();
        if self.base.is_none() {
            self.base = Some(entities);
        } else {
            self.narrow.push(entities.into_iter().collect());
        }
        self
    }

    /// Optional refinement applied after the intersection.
    pub fn filter<F: Fn(EntityId) -> bool + 'w>(mut self, predicate: F) -> Self {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// The entities present in every listed store at snapshot time.
    ///
    /// A query with no `with` clause matches nothing.
    pub fn execute(self) -> Vec<EntityId> {
        let base = match self.base {
            Some(base) => base,
            None => return Vec::new(),
        };
        base.into_iter()
            .filter(|e| self.narrow.iter().all(|set| set.contains(e)))
            .filter(|&e| self.predicate.as_ref().map_or(true, |p| p(e)))
            .collect()
    }

    /// Number of matching entities.
    pub fn count(self) -> usize {
        self.execute().len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::world::World;

    #[derive(Clone, PartialEq, Debug)]
    struct Glyph(char);

    #[derive(Clone)]
    struct Marked;

    #[derive(Clone)]
    struct Speed(f64);

    fn setup() -> World {
        let world = World::new(80, 24);
        world.register_component::<Glyph>("glyph");
        world.register_component::<Marked>("marked");
        world.register_component::<Speed>("speed");
        world
    }

    #[test]
    fn intersection_of_two_stores() {
        let world = setup();
        let both = world.create_entity();
        let only_glyph = world.create_entity();
        world.store::<Glyph>().insert(both, Glyph('a'));
        world.store::<Marked>().insert(both, Marked);
        world.store::<Glyph>().insert(only_glyph, Glyph('b'));

        let hits = world.query().with::<Glyph>().with::<Marked>().execute();
        assert_eq!(hits, vec![both]);
    }

    #[test]
    fn empty_query_matches_nothing() {
        let world = setup();
        world.create_entity();
        assert!(world.query().execute().is_empty());
    }

    #[test]
    fn predicate_refines() {
        let world = setup();
        let a = world.create_entity();
        let b = world.create_entity();
        world.store::<Glyph>().insert(a, Glyph('a'));
        world.store::<Glyph>().insert(b, Glyph('b'));

        let store = world.store::<Glyph>();
        let hits = world
            .query()
            .with::<Glyph>()
            .filter(|e| store.get(e).is_some_and(|g| g.0 == 'b'))
            .execute();
        assert_eq!(hits, vec![b]);
    }

    #[test]
    fn result_is_snapshot() {
        let world = setup();
        let a = world.create_entity();
        world.store::<Glyph>().insert(a, Glyph('a'));

        let hits = world.query().with::<Glyph>().execute();
        world.store::<Glyph>().remove(a);
        // The executed result does not reflect the later removal.
        assert_eq!(hits, vec![a]);
        assert_eq!(world.query().with::<Glyph>().count(), 0);
    }

    #[test]
    fn order_follows_first_store() {
        let world = setup();
        let mut spawned = Vec::new();
        for ch in ['x', 'y', 'z'] {
            let e = world.create_entity();
            world.store::<Glyph>().insert(e, Glyph(ch));
            world.store::<Speed>().insert(e, Speed(1.0));
            spawned.push(e);
        }
        let hits = world.query().with::<Glyph>().with::<Speed>().execute();
        assert_eq!(hits, spawned);
    }
}
