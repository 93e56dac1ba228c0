//! Cursor descriptor resource.
//!
//! The cursor is an entity (so heat/energy/shield/boost ride on component
//! stores like everything else) plus a [`CursorState`] resource of atomic
//! cells for the fields the renderer and input layer poll every frame:
//! position, score, and the transient error/blink/trail effect deadlines.

use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

use keystorm_ecs::entity::EntityId;
use keystorm_ecs::world::World;

use crate::components::{Boost, Energy, Heat, Shield};
use crate::config::GameConfig;

// ---------------------------------------------------------------------------
// CursorState
// ---------------------------------------------------------------------------

/// Shared cursor descriptor. All fields are atomic; safe to read from any
/// thread.
pub struct CursorState {
    entity_raw: AtomicU64,
    x: AtomicI32,
    y: AtomicI32,
    score: AtomicI64,
    error_until_us: AtomicU64,
    blink_code: AtomicU8,
    blink_until_us: AtomicU64,
    trail_until_us: AtomicU64,
}

impl CursorState {
    /// Create a descriptor with no entity and zeroed state.
    pub fn new() -> Self {
        Self {
            entity_raw: AtomicU64::new(0),
            x: AtomicI32::new(0),
            y: AtomicI32::new(0),
            score: AtomicI64::new(0),
            error_until_us: AtomicU64::new(0),
            blink_code: AtomicU8::new(0),
            blink_until_us: AtomicU64::new(0),
            trail_until_us: AtomicU64::new(0),
        }
    }

    // -- entity --------------------------------------------------------------

    /// The cursor entity handle ([`EntityId::NONE`] before the first spawn).
    pub fn entity(&self) -> EntityId {
        EntityId::from_raw(self.entity_raw.load(Ordering::SeqCst))
    }

    pub fn set_entity(&self, entity: EntityId) {
        self.entity_raw.store(entity.to_raw(), Ordering::SeqCst);
    }

    // -- position ------------------------------------------------------------

    pub fn pos(&self) -> (i32, i32) {
        (self.x.load(Ordering::SeqCst), self.y.load(Ordering::SeqCst))
    }

    pub fn set_pos(&self, x: i32, y: i32) {
        self.x.store(x, Ordering::SeqCst);
        self.y.store(y, Ordering::SeqCst);
    }

    /// Advance one column, clamped to the grid width.
    pub fn advance_column(&self, width: i32) {
        let _ = self
            .x
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |x| {
                Some((x + 1).min(width - 1))
            });
    }

    // -- score ---------------------------------------------------------------

    pub fn score(&self) -> i64 {
        self.score.load(Ordering::SeqCst)
    }

    pub fn add_score(&self, delta: i64) -> i64 {
        self.score.fetch_add(delta, Ordering::SeqCst) + delta
    }

    pub fn reset_score(&self) {
        self.score.store(0, Ordering::SeqCst);
    }

    // -- transient effects ---------------------------------------------------

    /// Start the cursor error flash.
    pub fn flash_error(&self, now: Duration, lasting: Duration) {
        self.error_until_us
            .store((now + lasting).as_micros() as u64, Ordering::SeqCst);
        // Blink code 0 is the error blink.
        self.blink_code.store(0, Ordering::SeqCst);
        self.blink_until_us
            .store((now + lasting).as_micros() as u64, Ordering::SeqCst);
    }

    pub fn error_active(&self, now: Duration) -> bool {
        (now.as_micros() as u64) < self.error_until_us.load(Ordering::SeqCst)
    }

    /// Start a score blink with the given color code (1..4).
    pub fn set_blink(&self, code: u8, now: Duration, lasting: Duration) {
        self.blink_code.store(code, Ordering::SeqCst);
        self.blink_until_us
            .store((now + lasting).as_micros() as u64, Ordering::SeqCst);
    }

    /// The active blink code, or `None` once the window passed.
    pub fn blink(&self, now: Duration) -> Option<u8> {
        if (now.as_micros() as u64) < self.blink_until_us.load(Ordering::SeqCst) {
            Some(self.blink_code.load(Ordering::SeqCst))
        } else {
            None
        }
    }

    /// Whether the movement-trail effect is live.
    pub fn trail_active(&self, now: Duration) -> bool {
        (now.as_micros() as u64) < self.trail_until_us.load(Ordering::SeqCst)
    }

    /// Extend the trail effect by `extension` from its current deadline (or
    /// from `now` if it already lapsed).
    pub fn extend_trail(&self, now: Duration, extension: Duration) {
        let now_us = now.as_micros() as u64;
        let ext_us = extension.as_micros() as u64;
        let _ = self
            .trail_until_us
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |until| {
                Some(until.max(now_us) + ext_us)
            });
    }

    /// Drop every transient effect (reset choreography).
    pub fn clear_effects(&self) {
        self.error_until_us.store(0, Ordering::SeqCst);
        self.blink_code.store(0, Ordering::SeqCst);
        self.blink_until_us.store(0, Ordering::SeqCst);
        self.trail_until_us.store(0, Ordering::SeqCst);
    }
}

impl Default for CursorState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Cursor spawn
// ---------------------------------------------------------------------------

/// Create the cursor entity with its stat components and point the descriptor
/// at it. Used at boot and by the reset choreography.
pub fn spawn_cursor(world: &World, _config: &GameConfig) -> EntityId {
    let cursor = world.create_entity();
    world.store::<Heat>().insert(cursor, Heat::new());
    world.store::<Energy>().insert(cursor, Energy::new(0));
    world.store::<Shield>().insert(cursor, Shield::new());
    world.store::<Boost>().insert(cursor, Boost::new());
    world.spatial().spawn(cursor, 0, 0);

    let state = world.resources().must_get::<CursorState>();
    state.set_entity(cursor);
    state.set_pos(0, 0);
    state.clear_effects();
    tracing::debug!(entity = %cursor, "cursor spawned");
    cursor
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
