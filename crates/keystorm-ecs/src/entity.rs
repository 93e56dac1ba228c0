//! Entity identifiers and allocation.
//!
//! An [`EntityId`] is an opaque 64-bit handle. Handle 0 is reserved as the
//! "none" value ([`EntityId::NONE`]) so that lookups into spatial slots can
//! return a cheap sentinel instead of an `Option`. Handles are allocated
//! strictly increasing and are never reused within a session -- a destroyed
//! handle stays dead, which makes stale references trivially detectable
//! without generation counters.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// An opaque entity handle.
///
/// Zero is reserved as "no entity". All real handles are >= 1.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// The reserved "no entity" sentinel.
    pub const NONE: EntityId = EntityId(0);

    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Whether this handle is the reserved sentinel.
    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "EntityId(none)")
        } else {
            write!(f, "EntityId({})", self.0)
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Allocates monotonically increasing [`EntityId`]s and tracks the live set.
///
/// Unlike generational allocators, indices are never recycled: the `next`
/// counter only moves forward. [`clear`](Self::clear) empties the live set but
/// keeps the counter so handles from before the clear stay stale;
/// [`reset`](Self::reset) additionally rewinds the counter to 1 and is only
/// used for a full session reset.
#[derive(Debug)]
pub struct EntityAllocator {
    /// Next handle value to hand out. Starts at 1; 0 is the NONE sentinel.
    next: u64,
    /// Currently alive handles.
    live: HashSet<EntityId>,
}

impl EntityAllocator {
    /// Create a new, empty allocator.
    pub fn new() -> Self {
        Self {
            next: 1,
            live: HashSet::new(),
        }
    }

    /// Allocate a fresh [`EntityId`], strictly greater than any handed out
    /// before.
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        self.live.insert(id);
        id
    }

    /// Deallocate (destroy) an entity.
    ///
    /// Returns `true` if the entity was alive, `false` for unknown or already
    /// dead handles (including [`EntityId::NONE`]).
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        self.live.remove(&id)
    }

    /// Whether `id` is currently alive.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.live.contains(&id)
    }

    /// Number of currently alive entities.
    pub fn alive_count(&self) -> usize {
        self.live.len()
    }

    /// Snapshot of all live handles at call time, in ascending order.
    pub fn live_handles(&self) -> Vec<EntityId> {
        let mut handles: Vec<EntityId> = self.live.iter().copied().collect();
        handles.sort();
        handles
    }

    /// Drop every live entity but keep the handle counter, so stale handles
    /// from before the clear remain stale forever.
    pub fn clear(&mut self) {
        self.live.clear();
    }

    /// Full reset: drop every live entity *and* rewind the counter so the
    /// next allocation is handle 1 again.
    pub fn reset(&mut self) {
        self.live.clear();
        self.next = 1;
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
