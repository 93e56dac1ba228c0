//! Gold bonus sequences.
//!
//! A gold word is a short bonus sequence placed at a free spot on the grid.
//! It lives for a fixed window and exits one of three ways:
//!
//! - **timeout** -- the remaining glyphs are destroyed;
//! - **completion** -- the player types every glyph in order; heat jumps to
//!   max (unless already higher);
//! - **placement failure** -- the grid had no room, nothing spawns.
//!
//! Every exit emits `GoldExpired`, which is what arms the decay timer -- the
//! game never stalls waiting for a gold word that could not spawn.
//!
//! The word's membership and order ride on `Nugget` components, so a world
//! clear cannot leak gold state; the resource only tracks the active window.

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::time::Duration;

use keystorm_ecs::entity::EntityId;
use keystorm_ecs::world::World;

use crate::audio::{AudioHandle, AudioKind};
use crate::clock::TimeResource;
use crate::components::{
    Character, Heat, Nugget, Sequence, SequenceColor, SequenceLevel, StyleId,
};
use crate::config::GameConfig;
use crate::cursor::CursorState;
use crate::event::{Event, EventKind, EventPayload, EventQueue};
use crate::schedule::System;
use crate::status::{StatusRegistry, KEY_GOLD_SPAWNED};
use crate::world_setup::SequenceIdGen;

/// Gold system priority.
pub const GOLD_PRIORITY: i32 = 30;

/// Placement attempts before giving up on a full grid.
const PLACEMENT_ATTEMPTS: usize = 64;

// ---------------------------------------------------------------------------
// GoldState
// ---------------------------------------------------------------------------

struct ActiveGold {
    sequence_id: u64,
    entities: Vec<EntityId>,
    /// Next `Nugget.order` the player must type.
    next_index: usize,
    deadline: Duration,
}

/// Shared gold-window state: the active word (if any) and the placement RNG.
pub struct GoldState {
    active: Mutex<Option<ActiveGold>>,
    rng: Mutex<Pcg64Mcg>,
}

impl GoldState {
    pub fn new(seed: u64) -> Self {
        Self {
            active: Mutex::new(None),
            // Offset the seed so gold placement and decay drops do not share
            // a stream.
            rng: Mutex::new(Pcg64Mcg::seed_from_u64(seed ^ 0x60_1d)),
        }
    }

    /// Whether a gold window is currently open.
    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// The active window's sequence id, if any.
    pub fn active_sequence_id(&self) -> Option<u64> {
        self.active.lock().as_ref().map(|a| a.sequence_id)
    }

    /// Drop the window without emitting anything (reset choreography).
    pub fn clear(&self) {
        *self.active.lock() = None;
    }
}

// ---------------------------------------------------------------------------
// Spawning
// ---------------------------------------------------------------------------

/// Spawn a gold word at a free location.
///
/// On success pushes `GoldSpawned` and returns `true`. If no free horizontal
/// span can be found the fallback `GoldExpired` is pushed immediately so the
/// decay pipeline still arms, and `false` is returned.
pub fn spawn_gold_sequence(world: &World, events: &EventQueue) -> bool {
    let config = world.resources().must_get::<GameConfig>();
    let state = world.resources().must_get::<GoldState>();
    let now = world.resources().must_get::<TimeResource>().now();

    if state.is_active() {
        tracing::debug!("gold window already open, spawn skipped");
        return false;
    }

    let length = config.gold_sequence_length;
    let span = match find_free_span(world, &config, &state, length) {
        Some(span) => span,
        None => {
            // Grid is full: arm decay anyway so the game never stalls.
            tracing::warn!("no free span for gold word, arming decay fallback");
            events.push(Event::with_payload(
                EventKind::GoldExpired,
                EventPayload::Gold { sequence_id: 0 },
            ));
            return false;
        }
    };

    let sequence_id = world.resources().must_get::<SequenceIdGen>().next_id();
    let alphabet: Vec<char> = config.alphabet.chars().collect();
    let mut rng = state.rng.lock();

    let mut entities = Vec::with_capacity(length);
    let mut tx = world.spatial().begin();
    for i in 0..length {
        let glyph = alphabet[rng.gen_range(0..alphabet.len())];
        let entity = world.create_entity();
        world
            .store::<Character>()
            .insert(entity, Character { glyph, style: StyleId(4) });
        world.store::<Sequence>().insert(
            entity,
            Sequence {
                id: sequence_id,
                index: i,
                color: SequenceColor::Gold,
                level: SequenceLevel::Bright,
            },
        );
        world.store::<Nugget>().insert(entity, Nugget { order: i });
        tx.spawn(entity, span.0 + i as i32, span.1);
        entities.push(entity);
    }
    // The whole word appears at once.
    tx.commit();
    drop(rng);

    *state.active.lock() = Some(ActiveGold {
        sequence_id,
        entities,
        next_index: 0,
        deadline: now + Duration::from_secs_f64(config.gold_sequence_secs),
    });

    world
        .resources()
        .must_get::<StatusRegistry>()
        .incr(KEY_GOLD_SPAWNED, 1);
    events.push(Event::with_payload(
        EventKind::GoldSpawned,
        EventPayload::Gold { sequence_id },
    ));
    tracing::debug!(sequence_id, x = span.0, y = span.1, "gold word spawned");
    true
}

/// Random search for a horizontal span of `length` empty cells.
fn find_free_span(
    world: &World,
    config: &GameConfig,
    state: &GoldState,
    length: usize,
) -> Option<(i32, i32)> {
    if length as i32 > config.width {
        return None;
    }
    let mut rng = state.rng.lock();
    for _ in 0..PLACEMENT_ATTEMPTS {
        let x = rng.gen_range(0..=(config.width - length as i32));
        let y = rng.gen_range(0..config.height);
        let free = (0..length as i32)
            .all(|i| world.spatial().get_all_at(x + i, y).is_empty());
        if free {
            return Some((x, y));
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Typing path
// ---------------------------------------------------------------------------

/// Consume a typed gold glyph.
///
/// Only the glyph with the next expected order advances the word; others are
/// ignored (gold is typed strictly in order, and a stray gold keystroke is
/// not an error). Completion raises heat to max -- no level or color math --
/// and closes the window.
pub fn handle_gold_typing(world: &World, events: &EventQueue, target: EntityId) {
    let config = world.resources().must_get::<GameConfig>();
    let state = world.resources().must_get::<GoldState>();
    let cursor = world.resources().must_get::<CursorState>();
    let now = world.resources().must_get::<TimeResource>().now();

    let Some(nugget) = world.store::<Nugget>().get(target) else {
        return;
    };

    let mut active_guard = state.active.lock();
    let Some(active) = active_guard.as_mut() else {
        return;
    };
    if nugget.order != active.next_index {
        return;
    }

    world.destroy_entity(target);
    active.next_index += 1;
    cursor.advance_column(config.width);
    cursor.set_blink(
        SequenceColor::Gold.blink_code(),
        now,
        Duration::from_secs_f64(config.score_blink_secs),
    );

    if active.next_index == active.entities.len() {
        let sequence_id = active.sequence_id;
        *active_guard = None;
        drop(active_guard);

        // Completion: heat to max unless already higher.
        let cursor_entity = cursor.entity();
        if let Some(heat) = world.store::<Heat>().get(cursor_entity) {
            if heat.load() < config.max_heat {
                heat.store_clamped(config.max_heat, config.max_heat);
            }
        }
        if let Some(audio) = world.resources().get::<AudioHandle>() {
            audio.send_real_time(AudioKind::Chime, 3, now);
        }
        events.push(Event::with_payload(
            EventKind::GoldExpired,
            EventPayload::Gold { sequence_id },
        ));
        tracing::debug!(sequence_id, "gold word completed");
    }
}

// ---------------------------------------------------------------------------
// GoldSystem
// ---------------------------------------------------------------------------

/// Watches the gold window deadline.
pub struct GoldSystem;

impl GoldSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GoldSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for GoldSystem {
    fn name(&self) -> &'static str {
        "gold"
    }

    fn priority(&self) -> i32 {
        GOLD_PRIORITY
    }

    fn event_kinds(&self) -> &[EventKind] {
        &[EventKind::GameReset]
    }

    fn handle_event(&mut self, world: &World, _events: &EventQueue, event: &Event) {
        if event.kind == EventKind::GameReset {
            world.resources().must_get::<GoldState>().clear();
        }
    }

    fn update(&mut self, world: &World, events: &EventQueue, _dt: f64) {
        let state = world.resources().must_get::<GoldState>();
        let now = world.resources().must_get::<TimeResource>().now();

        let mut active_guard = state.active.lock();
        let Some(active) = active_guard.as_ref() else {
            return;
        };
        if now < active.deadline {
            return;
        }

        // Timeout: destroy what remains and close the window.
        let sequence_id = active.sequence_id;
        let leftovers: Vec<EntityId> = active.entities.clone();
        *active_guard = None;
        drop(active_guard);

        for entity in leftovers {
            // Already-typed glyphs are dead handles; destroy is a no-op there.
            world.destroy_entity(entity);
        }
        events.push(Event::with_payload(
            EventKind::GoldExpired,
            EventPayload::Gold { sequence_id },
        ));
        tracing::debug!(sequence_id, "gold word timed out");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
