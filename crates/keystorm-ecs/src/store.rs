//! Typed component stores.
//!
//! A [`ComponentStore<T>`] maps entities to values of one component type. The
//! map is paired with a dense vector of live handles so that
//! [`entities`](ComponentStore::entities) can hand out a snapshot copy of the
//! handle list -- iterating that snapshot while another thread mutates the
//! store is safe, and readers see either the pre- or post-mutation value for
//! each entry, never a torn one.
//!
//! The simulation thread is the only writer; the render thread and diagnostic
//! threads read concurrently. A `parking_lot::RwLock` guards the interior, and
//! every read accessor returns owned copies so no lock is held across caller
//! code.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::entity::EntityId;

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Marker bound for component values.
///
/// Components are plain cloneable data. Types that need shared atomic cells
/// (e.g. a heat counter read by the render thread) embed `Arc<Atomic*>` fields
/// so clones stay live views of the same cell.
pub trait Component: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Component for T {}

// ---------------------------------------------------------------------------
// ComponentStore
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct StoreInner<T> {
    map: HashMap<EntityId, T>,
    dense: Vec<EntityId>,
}

/// Dense map `entity -> T` with snapshot iteration.
#[derive(Debug)]
pub struct ComponentStore<T: Component> {
    inner: RwLock<StoreInner<T>>,
}

impl<T: Component> ComponentStore<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                map: HashMap::new(),
                dense: Vec::new(),
            }),
        }
    }

    /// Value copy for `entity`, or `None` if absent.
    pub fn get(&self, entity: EntityId) -> Option<T> {
        self.inner.read().map.get(&entity).cloned()
    }

    /// Insert or overwrite the component for `entity`.
    pub fn insert(&self, entity: EntityId, value: T) {
        let mut inner = self.inner.write();
        if inner.map.insert(entity, value).is_none() {
            inner.dense.push(entity);
        }
    }

    /// Remove the component for `entity`. Idempotent; returns the removed
    /// value if one was present.
    pub fn remove(&self, entity: EntityId) -> Option<T> {
        let mut inner = self.inner.write();
        let removed = inner.map.remove(&entity);
        if removed.is_some() {
            if let Some(pos) = inner.dense.iter().position(|&e| e == entity) {
                inner.dense.swap_remove(pos);
            }
        }
        removed
    }

    /// Whether `entity` has this component.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.inner.read().map.contains_key(&entity)
    }

    /// Number of entries. O(1).
    pub fn len(&self) -> usize {
        self.inner.read().dense.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the live handle list at call time.
    ///
    /// The returned vector is owned by the caller: entries added or removed
    /// after this call are not reflected, and iterating it concurrently with
    /// mutation is safe.
    pub fn entities(&self) -> Vec<EntityId> {
        self.inner.read().dense.clone()
    }

    /// Snapshot of `(entity, value)` pairs at call time.
    pub fn iter_snapshot(&self) -> Vec<(EntityId, T)> {
        let inner = self.inner.read();
        inner
            .dense
            .iter()
            .filter_map(|&e| inner.map.get(&e).map(|v| (e, v.clone())))
            .collect()
    }

    /// Edit the component in place under the write lock.
    ///
    /// Returns `true` if the entity had the component and `f` ran.
    pub fn update<F: FnOnce(&mut T)>(&self, entity: EntityId, f: F) -> bool {
        let mut inner = self.inner.write();
        match inner.map.get_mut(&entity) {
            Some(value) => {
                f(value);
                true
            }
            None => false,
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.map.clear();
        inner.dense.clear();
    }
}

impl<T: Component> Default for ComponentStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// AnyStore
// ---------------------------------------------------------------------------

/// Type-erased facet of a component store.
///
/// The world keeps one `Arc<dyn AnyStore>` per registered component type so
/// that entity destruction and world clears can be broadcast without knowing
/// the component types, and so the debug overlay can report per-store counts.
pub trait AnyStore: Send + Sync {
    /// Drop the entry for `entity` if present. Idempotent.
    fn discard(&self, entity: EntityId);

    /// Drop every entry.
    fn clear_all(&self);

    /// Number of entries.
    fn count(&self) -> usize;
}

impl<T: Component> AnyStore for ComponentStore<T> {
    fn discard(&self, entity: EntityId) {
        self.remove(entity);
    }

    fn clear_all(&self) {
        self.clear();
    }

    fn count(&self) -> usize {
        self.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct Label(String);

    fn e(raw: u64) -> EntityId {
        EntityId::from_raw(raw)
    }

    #[test]
    fn get_returns_copy_or_none() {
        let store = ComponentStore::new();
        store.insert(e(1), Label("a".into()));
        assert_eq!(store.get(e(1)), Some(Label("a".into())));
        assert_eq!(store.get(e(2)), None);
    }

    #[test]
    fn insert_is_upsert() {
        let store = ComponentStore::new();
        store.insert(e(1), Label("a".into()));
        store.insert(e(1), Label("b".into()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(e(1)), Some(Label("b".into())));
    }

    #[test]
    fn remove_is_idempotent() {
        let store = ComponentStore::new();
        store.insert(e(1), Label("a".into()));
        assert_eq!(store.remove(e(1)), Some(Label("a".into())));
        assert_eq!(store.remove(e(1)), None);
        assert_eq!(store.len(), 0);
        assert!(store.entities().is_empty());
    }

    #[test]
    fn entities_is_a_snapshot() {
        let store = ComponentStore::new();
        store.insert(e(1), Label("a".into()));
        store.insert(e(2), Label("b".into()));
        let snapshot = store.entities();
        store.remove(e(1));
        store.insert(e(3), Label("c".into()));
        // The snapshot is unaffected by later mutation.
        assert_eq!(snapshot, vec![e(1), e(2)]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn update_edits_in_place() {
        let store = ComponentStore::new();
        store.insert(e(1), Label("a".into()));
        assert!(store.update(e(1), |l| l.0.push('x')));
        assert_eq!(store.get(e(1)), Some(Label("ax".into())));
        assert!(!store.update(e(2), |_| unreachable!()));
    }

    #[test]
    fn concurrent_snapshot_iteration() {
        let store = Arc::new(ComponentStore::new());
        for i in 1..=1000 {
            store.insert(e(i), Label(format!("{i}")));
        }

        let reader = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                let mut seen = 0usize;
                for _ in 0..50 {
                    for entity in store.entities() {
                        if store.get(entity).is_some() {
                            seen += 1;
                        }
                    }
                }
                seen
            })
        };

        for i in 1..=1000 {
            if i % 2 == 0 {
                store.remove(e(i));
            } else {
                store.update(e(i), |l| l.0.push('!'));
            }
        }

        // The reader must terminate without panicking; counts vary with timing.
        let _ = reader.join().unwrap();
    }

    #[test]
    fn any_store_discard_and_count() {
        let store = ComponentStore::new();
        store.insert(e(1), Label("a".into()));
        store.insert(e(2), Label("b".into()));
        let erased: &dyn AnyStore = &store;
        assert_eq!(erased.count(), 2);
        erased.discard(e(1));
        erased.discard(e(1)); // idempotent
        assert_eq!(erased.count(), 1);
        erased.clear_all();
        assert_eq!(erased.count(), 0);
    }
}
