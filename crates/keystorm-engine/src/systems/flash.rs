//! Transient flash cells.
//!
//! A flash marks a destruction (or any requested VFX) for a fraction of a
//! second and then removes itself. Spawning goes two ways: systems call
//! [`spawn_destruction_flash`] directly; the input layer and remote systems
//! push a `FlashRequest` event.

use keystorm_ecs::world::World;

use crate::components::Flash;
use crate::config::GameConfig;
use crate::event::{Event, EventKind, EventQueue};
use crate::schedule::System;
use crate::status::{StatusRegistry, KEY_PAYLOAD_MISMATCH};

/// Flash system priority; runs after every spawner of flashes.
pub const FLASH_PRIORITY: i32 = 60;

// ---------------------------------------------------------------------------
// Spawn helper
// ---------------------------------------------------------------------------

/// Spawn a destruction flash at a cell.
pub fn spawn_destruction_flash(world: &World, x: i32, y: i32, glyph: char) {
    let config = world.resources().must_get::<GameConfig>();
    let entity = world.create_entity();
    world.store::<Flash>().insert(
        entity,
        Flash {
            x,
            y,
            glyph,
            remaining: config.destruction_flash_secs,
            duration: config.destruction_flash_secs,
        },
    );
}

// ---------------------------------------------------------------------------
// FlashSystem
// ---------------------------------------------------------------------------

/// Counts flashes down and destroys them at zero.
pub struct FlashSystem;

impl FlashSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FlashSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for FlashSystem {
    fn name(&self) -> &'static str {
        "flash"
    }

    fn priority(&self) -> i32 {
        FLASH_PRIORITY
    }

    fn event_kinds(&self) -> &[EventKind] {
        &[EventKind::FlashRequest]
    }

    fn handle_event(&mut self, world: &World, _events: &EventQueue, event: &Event) {
        match event.payload.flash() {
            Some((x, y, glyph)) => spawn_destruction_flash(world, x, y, glyph),
            None => {
                world
                    .resources()
                    .must_get::<StatusRegistry>()
                    .incr(KEY_PAYLOAD_MISMATCH, 1);
            }
        }
    }

    fn update(&mut self, world: &World, _events: &EventQueue, dt: f64) {
        let flashes = world.store::<Flash>();
        for (entity, flash) in flashes.iter_snapshot() {
            let remaining = flash.remaining - dt;
            if remaining <= 0.0 {
                world.destroy_entity(entity);
            } else {
                flashes.update(entity, |f| f.remaining = remaining);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
