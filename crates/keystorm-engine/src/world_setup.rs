//! World construction: store registration and base resources.
//!
//! Every component store the simulation uses is registered here, once, at
//! startup. Systems and tests go through [`build_world`] so the store set and
//! the resource set are identical everywhere.

use std::sync::atomic::{AtomicU64, Ordering};

use keystorm_ecs::world::World;

use crate::components::{
    Boost, Character, Cleaner, Drain, Energy, FallingDecay, Flash, Heat, Nugget, Sequence, Shield,
    TrailMarker,
};
use crate::config::GameConfig;
use crate::cursor::CursorState;
use crate::status::StatusRegistry;
use crate::systems::gold::GoldState;
use crate::systems::meta::{OverlayState, ResetSignal};

// ---------------------------------------------------------------------------
// SequenceIdGen
// ---------------------------------------------------------------------------

/// Monotonic sequence-id source. Reset rewinds it (reset choreography step 3).
pub struct SequenceIdGen {
    next: AtomicU64,
}

impl SequenceIdGen {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Hand out the next sequence id.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Rewind to 1.
    pub fn reset(&self) {
        self.next.store(1, Ordering::SeqCst);
    }
}

impl Default for SequenceIdGen {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// build_world
// ---------------------------------------------------------------------------

/// Build a world with every game component store registered and the base
/// resources installed.
///
/// The time resource and audio handle are installed by the simulation driver
/// (tests install a mock clock instead).
pub fn build_world(config: &GameConfig) -> World {
    let world = World::new(config.width, config.height);

    world.register_component::<Character>("character");
    world.register_component::<Sequence>("sequence");
    world.register_component::<Cleaner>("cleaner");
    world.register_component::<FallingDecay>("falling_decay");
    world.register_component::<Flash>("flash");
    world.register_component::<Heat>("heat");
    world.register_component::<Energy>("energy");
    world.register_component::<Shield>("shield");
    world.register_component::<Boost>("boost");
    world.register_component::<Drain>("drain");
    world.register_component::<Nugget>("nugget");
    world.register_component::<TrailMarker>("trail_marker");

    world.resources().insert(config.clone());
    world.resources().insert(CursorState::new());
    world.resources().insert(StatusRegistry::new());
    world.resources().insert(SequenceIdGen::new());
    world.resources().insert(OverlayState::new());
    world.resources().insert(ResetSignal::new());
    world.resources().insert(GoldState::new(config.rng_seed));

    world
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
