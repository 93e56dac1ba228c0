//! Cursor shield and energy sink.
//!
//! The shield is event-driven: `ShieldActivate` / `ShieldDeactivate` flip the
//! cursor's Shield component, `ShieldDrain` converts a costed action into an
//! `EnergyAdd(-amount)` event. While active, the shield also drains passively
//! on a fixed interval, polled each tick against the clock.
//!
//! `EnergyAdd` events from any source are consumed here and applied to the
//! cursor's energy cell, floored at zero.

use keystorm_ecs::world::World;

use crate::clock::TimeResource;
use crate::components::{Drain, Energy, Shield};
use crate::config::GameConfig;
use crate::cursor::CursorState;
use crate::event::{Event, EventKind, EventPayload, EventQueue};
use crate::schedule::System;
use crate::status::{StatusRegistry, KEY_PAYLOAD_MISMATCH};

/// Shield system priority.
pub const SHIELD_PRIORITY: i32 = 20;

// ---------------------------------------------------------------------------
// ShieldSystem
// ---------------------------------------------------------------------------

pub struct ShieldSystem;

impl ShieldSystem {
    pub fn new() -> Self {
        Self
    }

    fn cursor_shield(world: &World) -> Option<Shield> {
        let cursor = world.resources().must_get::<CursorState>().entity();
        world.store::<Shield>().get(cursor)
    }

    fn mismatch(world: &World) {
        world
            .resources()
            .must_get::<StatusRegistry>()
            .incr(KEY_PAYLOAD_MISMATCH, 1);
    }
}

impl Default for ShieldSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ShieldSystem {
    fn name(&self) -> &'static str {
        "shield"
    }

    fn priority(&self) -> i32 {
        SHIELD_PRIORITY
    }

    fn event_kinds(&self) -> &[EventKind] {
        &[
            EventKind::ShieldActivate,
            EventKind::ShieldDeactivate,
            EventKind::ShieldDrain,
            EventKind::EnergyAdd,
        ]
    }

    fn handle_event(&mut self, world: &World, events: &EventQueue, event: &Event) {
        match event.kind {
            EventKind::ShieldActivate => {
                let cursor = world.resources().must_get::<CursorState>().entity();
                if let Some(shield) = world.store::<Shield>().get(cursor) {
                    let now = world.resources().must_get::<TimeResource>().now();
                    shield.set_active(true);
                    shield.set_last_drain(now);
                    // The passive drain effect, resolved lazily via the store.
                    world.store::<Drain>().insert(cursor, Drain { target: cursor });
                }
            }
            EventKind::ShieldDeactivate => {
                let cursor = world.resources().must_get::<CursorState>().entity();
                if let Some(shield) = world.store::<Shield>().get(cursor) {
                    shield.set_active(false);
                    world.store::<Drain>().remove(cursor);
                }
            }
            EventKind::ShieldDrain => match event.payload.energy() {
                Some(amount) => events.push(Event::with_payload(
                    EventKind::EnergyAdd,
                    EventPayload::Energy { amount: -amount },
                )),
                None => Self::mismatch(world),
            },
            EventKind::EnergyAdd => match event.payload.energy() {
                Some(amount) => {
                    let cursor = world.resources().must_get::<CursorState>().entity();
                    if let Some(energy) = world.store::<Energy>().get(cursor) {
                        energy.add(amount);
                    }
                }
                None => Self::mismatch(world),
            },
            _ => {}
        }
    }

    fn update(&mut self, world: &World, events: &EventQueue, _dt: f64) {
        let Some(shield) = Self::cursor_shield(world) else {
            return;
        };
        if !shield.is_active() {
            return;
        }
        let config = world.resources().must_get::<GameConfig>();
        let now = world.resources().must_get::<TimeResource>().now();
        let interval = std::time::Duration::from_secs_f64(config.shield_drain_interval_secs);
        if now.saturating_sub(shield.last_drain()) >= interval {
            events.push(Event::with_payload(
                EventKind::EnergyAdd,
                EventPayload::Energy {
                    amount: -config.shield_drain_amount,
                },
            ));
            shield.set_last_drain(now);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
