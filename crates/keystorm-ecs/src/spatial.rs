//! Grid-based spatial index with transactional updates.
//!
//! The [`SpatialIndex`] maps integer grid cells to insertion-ordered lists of
//! entity handles. It owns the canonical [`Position`] store: `spawn`, `move_to`
//! and `despawn` keep slot membership and the Position component in lock-step,
//! which is what upholds the index/Position agreement invariant.
//!
//! Readers get copied slices ([`get_all_at`](SpatialIndex::get_all_at)) so a
//! loop over a cell's occupants survives concurrent removals. The "topmost"
//! entity of a cell is the most recently inserted one.
//!
//! Coordinates outside the grid are clamped; a clamped operation is not an
//! error.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::entity::EntityId;
use crate::store::ComponentStore;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Integer grid cell occupied by an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Column, in `[0, width)`.
    pub x: i32,
    /// Row, in `[0, height)`.
    pub y: i32,
}

// ---------------------------------------------------------------------------
// SpatialIndex
// ---------------------------------------------------------------------------

struct Slots {
    /// Row-major `width * height` cells, each an insertion-ordered handle list.
    cells: Vec<Vec<EntityId>>,
    /// Authoritative entity -> cell map for slot membership. The Position
    /// component store mirrors this for queries and the renderer.
    located: HashMap<EntityId, (i32, i32)>,
}

/// Two-dimensional grid of entity slots plus the canonical Position store.
pub struct SpatialIndex {
    width: i32,
    height: i32,
    slots: RwLock<Slots>,
    positions: Arc<ComponentStore<Position>>,
}

impl SpatialIndex {
    /// Create an index for a `width x height` grid.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is not positive.
    pub fn new(width: i32, height: i32) -> Self {
        assert!(
            width > 0 && height > 0,
            "grid dimensions must be positive, got {width}x{height}"
        );
        let cell_count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            slots: RwLock::new(Slots {
                cells: vec![Vec::new(); cell_count],
                located: HashMap::new(),
            }),
            positions: Arc::new(ComponentStore::new()),
        }
    }

    /// Grid width.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Grid height.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// The canonical Position store backing this index.
    pub fn positions(&self) -> Arc<ComponentStore<Position>> {
        Arc::clone(&self.positions)
    }

    #[inline]
    fn clamp(&self, x: i32, y: i32) -> (i32, i32) {
        (x.clamp(0, self.width - 1), y.clamp(0, self.height - 1))
    }

    #[inline]
    fn cell_index(&self, x: i32, y: i32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// Attach `entity` to the cell at `(x, y)` (clamped) and set its Position.
    ///
    /// If the entity is already in the index it is moved instead.
    pub fn spawn(&self, entity: EntityId, x: i32, y: i32) {
        if entity.is_none() {
            return;
        }
        let mut slots = self.slots.write();
        self.apply_spawn(&mut slots, entity, x, y);
    }

    /// Move `entity` to the cell at `(x, y)` (clamped), updating its Position.
    ///
    /// Unknown entities are spawned at the target cell.
    pub fn move_to(&self, entity: EntityId, x: i32, y: i32) {
        self.spawn(entity, x, y);
    }

    /// Detach `entity` from its cell and drop its Position. No-op for unknown
    /// entities.
    pub fn despawn(&self, entity: EntityId) {
        let mut slots = self.slots.write();
        self.apply_despawn(&mut slots, entity);
    }

    /// Copied slice of every entity at `(x, y)` (clamped), in insertion order.
    pub fn get_all_at(&self, x: i32, y: i32) -> Vec<EntityId> {
        let (x, y) = self.clamp(x, y);
        let slots = self.slots.read();
        slots.cells[self.cell_index(x, y)].clone()
    }

    /// The topmost (most recently inserted) entity at `(x, y)` (clamped), or
    /// [`EntityId::NONE`] for an empty cell.
    pub fn get_entity_at(&self, x: i32, y: i32) -> EntityId {
        let (x, y) = self.clamp(x, y);
        let slots = self.slots.read();
        slots.cells[self.cell_index(x, y)]
            .last()
            .copied()
            .unwrap_or(EntityId::NONE)
    }

    /// Current cell of `entity`, if indexed.
    pub fn position_of(&self, entity: EntityId) -> Option<Position> {
        let slots = self.slots.read();
        slots.located.get(&entity).map(|&(x, y)| Position { x, y })
    }

    /// Number of indexed entities.
    pub fn len(&self) -> usize {
        self.slots.read().located.len()
    }

    /// Whether the index holds no entities.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entity from the index and the Position store.
    pub fn clear(&self) {
        let mut slots = self.slots.write();
        for cell in &mut slots.cells {
            cell.clear();
        }
        slots.located.clear();
        self.positions.clear();
    }

    /// Begin a transaction batching spawn/move/despawn operations.
    ///
    /// The batched operations apply together on [`commit`](SpatialTransaction::commit)
    /// under a single write lock, so no intermediate state is visible to
    /// readers. Dropping the transaction without committing discards it.
    pub fn begin(&self) -> SpatialTransaction<'_> {
        SpatialTransaction {
            index: self,
            ops: Vec::new(),
        }
    }

    // -- lock-held primitives ------------------------------------------------

    fn apply_spawn(&self, slots: &mut Slots, entity: EntityId, x: i32, y: i32) {
        let (x, y) = self.clamp(x, y);
        if let Some(&(old_x, old_y)) = slots.located.get(&entity) {
            if (old_x, old_y) == (x, y) {
                self.positions.insert(entity, Position { x, y });
                return;
            }
            let idx = self.cell_index(old_x, old_y);
            slots.cells[idx].retain(|&e| e != entity);
        }
        let idx = self.cell_index(x, y);
        slots.cells[idx].push(entity);
        slots.located.insert(entity, (x, y));
        self.positions.insert(entity, Position { x, y });
    }

    fn apply_despawn(&self, slots: &mut Slots, entity: EntityId) {
        if let Some((x, y)) = slots.located.remove(&entity) {
            let idx = self.cell_index(x, y);
            slots.cells[idx].retain(|&e| e != entity);
        }
        self.positions.remove(entity);
    }
}

// ---------------------------------------------------------------------------
// SpatialTransaction
// ---------------------------------------------------------------------------

enum SpatialOp {
    Spawn(EntityId, i32, i32),
    Move(EntityId, i32, i32),
    Despawn(EntityId),
}

/// Batched spatial mutations applied atomically on commit.
pub struct SpatialTransaction<'a> {
    index: &'a SpatialIndex,
    ops: Vec<SpatialOp>,
}

impl SpatialTransaction<'_> {
    /// Queue a spawn.
    pub fn spawn(&mut self, entity: EntityId, x: i32, y: i32) -> &mut Self {
        self.ops.push(SpatialOp::Spawn(entity, x, y));
        self
    }

    /// Queue a move.
    pub fn move_to(&mut self, entity: EntityId, x: i32, y: i32) -> &mut Self {
        self.ops.push(SpatialOp::Move(entity, x, y));
        self
    }

    /// Queue a despawn.
    pub fn despawn(&mut self, entity: EntityId) -> &mut Self {
        self.ops.push(SpatialOp::Despawn(entity));
        self
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether no operations are queued.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply all queued operations in order under one write lock.
    pub fn commit(self) {
        if self.ops.is_empty() {
            return;
        }
        let mut slots = self.index.slots.write();
        for op in &self.ops {
            match *op {
                SpatialOp::Spawn(entity, x, y) | SpatialOp::Move(entity, x, y) => {
                    if !entity.is_none() {
                        self.index.apply_spawn(&mut slots, entity, x, y);
                    }
                }
                SpatialOp::Despawn(entity) => {
                    self.index.apply_despawn(&mut slots, entity);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
