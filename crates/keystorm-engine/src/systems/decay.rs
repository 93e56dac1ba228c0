//! Falling decay drops.
//!
//! Idle targets lose a brightness level each time a raindrop crosses them:
//! `Bright -> Normal -> Dark -> destroyed`. Drops sweep their column with the
//! same anti-tunneling discipline as cleaners, plus two dedup layers:
//!
//! - the **coordinate latch** (`last_int_y` on the drop) keeps one drop from
//!   re-consuming a row it already hit when sub-cell motion re-enters it;
//! - the per-call `processed_cells` scratch set keeps two drops in the same
//!   tick from hitting the same cell -- only the first wins.
//!
//! Decay is gated by the gold sequence: the timer arms only when a gold
//! window closes, with an interval interpolated from the heat at that moment.
//! A wave spawns one drop per column that still holds a sequence target above
//! the bottom row.

use std::collections::HashSet;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

use keystorm_ecs::world::World;

use crate::clock::TimeResource;
use crate::components::{FallingDecay, Heat, Sequence};
use crate::config::GameConfig;
use crate::cursor::CursorState;
use crate::event::{Event, EventKind, EventQueue};
use crate::schedule::System;
use crate::status::{StatusRegistry, KEY_DECAY_WAVES};
use crate::systems::flash::spawn_destruction_flash;

/// Decay system priority.
pub const DECAY_PRIORITY: i32 = 50;

// ---------------------------------------------------------------------------
// DecaySystem
// ---------------------------------------------------------------------------

pub struct DecaySystem {
    /// Next wave deadline; `None` until a gold window closes.
    armed_deadline: Option<Duration>,
    rng: Pcg64Mcg,
}

impl DecaySystem {
    pub fn new(seed: u64) -> Self {
        Self {
            armed_deadline: None,
            rng: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// The armed wave deadline, if any.
    pub fn armed_deadline(&self) -> Option<Duration> {
        self.armed_deadline
    }

    fn cursor_heat(world: &World) -> i64 {
        let cursor = world.resources().must_get::<CursorState>().entity();
        world.store::<Heat>().get(cursor).map_or(0, |h| h.load())
    }

    fn arm(&mut self, world: &World) {
        let config = world.resources().must_get::<GameConfig>();
        let now = world.resources().must_get::<TimeResource>().now();
        let heat = Self::cursor_heat(world);
        let interval = config.decay_interval(heat);
        self.armed_deadline = Some(now + interval);
        tracing::debug!(heat, ?interval, "decay timer armed");
    }

    /// Columns holding at least one sequence target above the bottom row.
    fn occupied_columns(world: &World) -> Vec<i32> {
        let height = world.spatial().height();
        let mut columns: Vec<i32> = world
            .store::<Sequence>()
            .entities()
            .into_iter()
            .filter_map(|e| world.position_of(e))
            .filter(|p| p.y < height - 1)
            .map(|p| p.x)
            .collect();
        columns.sort_unstable();
        columns.dedup();
        columns
    }

    fn spawn_wave(&mut self, world: &World) {
        let config = world.resources().must_get::<GameConfig>();
        let columns = Self::occupied_columns(world);
        if columns.is_empty() {
            return;
        }
        let alphabet: Vec<char> = config.alphabet.chars().collect();
        for column in &columns {
            let speed = self
                .rng
                .gen_range(config.falling_min_speed..=config.falling_max_speed);
            let glyph = alphabet[self.rng.gen_range(0..alphabet.len())];
            let entity = world.create_entity();
            world.store::<FallingDecay>().insert(
                entity,
                FallingDecay {
                    column: *column,
                    precise_y: -1.0,
                    speed,
                    glyph,
                    last_change_row: -1,
                    last_int_x: *column,
                    last_int_y: -1,
                    prev_precise_x: *column as f64,
                    prev_precise_y: -1.0,
                },
            );
        }
        world
            .resources()
            .must_get::<StatusRegistry>()
            .incr(KEY_DECAY_WAVES, 1);
        tracing::debug!(columns = columns.len(), "decay wave spawned");
    }

    /// Topmost entity at the cell that carries a Sequence component.
    fn topmost_sequence_at(world: &World, x: i32, y: i32) -> Option<keystorm_ecs::entity::EntityId> {
        let sequences = world.store::<Sequence>();
        world
            .spatial()
            .get_all_at(x, y)
            .into_iter()
            .rev()
            .find(|&e| sequences.contains(e))
    }

    fn update_falling_entities(&mut self, world: &World, dt: f64) {
        let config = world.resources().must_get::<GameConfig>();
        let drops = world.store::<FallingDecay>();
        let sequences = world.store::<Sequence>();
        let alphabet: Vec<char> = config.alphabet.chars().collect();
        // Cells hit this call; the first drop to claim a cell wins the tick.
        let mut processed_cells: HashSet<(i32, i32)> = HashSet::new();

        for (entity, mut drop) in drops.iter_snapshot() {
            drop.prev_precise_y = drop.precise_y;
            drop.prev_precise_x = drop.column as f64;
            drop.precise_y += drop.speed * dt;

            let from = drop.prev_precise_y.floor() as i32 + 1;
            let to = drop.precise_y.floor() as i32;
            for row in from..=to {
                // Matrix effect: the glyph may mutate on every new row.
                if row != drop.last_change_row
                    && self.rng.gen_bool(config.glyph_mutation_chance)
                {
                    drop.glyph = alphabet[self.rng.gen_range(0..alphabet.len())];
                    drop.last_change_row = row;
                }

                if row < 0 || row >= config.height {
                    continue;
                }
                // Coordinate latch: never re-consume a row already hit.
                if row <= drop.last_int_y {
                    continue;
                }
                // Per-tick cell dedup across drops.
                if processed_cells.contains(&(drop.column, row)) {
                    continue;
                }
                let Some(target) = Self::topmost_sequence_at(world, drop.column, row) else {
                    continue;
                };

                processed_cells.insert((drop.column, row));
                drop.last_int_x = drop.column;
                drop.last_int_y = row;

                let Some(sequence) = sequences.get(target) else {
                    continue;
                };
                match sequence.level.demote() {
                    Some(level) => {
                        sequences.update(target, |s| s.level = level);
                    }
                    None => {
                        let glyph = world
                            .store::<crate::components::Character>()
                            .get(target)
                            .map_or('*', |c| c.glyph);
                        spawn_destruction_flash(world, drop.column, row, glyph);
                        world.destroy_entity(target);
                    }
                }
            }

            if drop.precise_y >= (config.height + config.falling_tail_margin) as f64 {
                world.destroy_entity(entity);
            } else {
                drops.insert(entity, drop);
            }
        }
    }
}

impl System for DecaySystem {
    fn name(&self) -> &'static str {
        "decay"
    }

    fn priority(&self) -> i32 {
        DECAY_PRIORITY
    }

    fn event_kinds(&self) -> &[EventKind] {
        &[
            EventKind::GoldExpired,
            EventKind::DecayTick,
            EventKind::GameReset,
        ]
    }

    fn handle_event(&mut self, world: &World, _events: &EventQueue, event: &Event) {
        match event.kind {
            EventKind::GoldExpired => self.arm(world),
            EventKind::DecayTick => self.spawn_wave(world),
            EventKind::GameReset => self.armed_deadline = None,
            _ => {}
        }
    }

    fn update(&mut self, world: &World, _events: &EventQueue, dt: f64) {
        if let Some(deadline) = self.armed_deadline {
            let now = world.resources().must_get::<TimeResource>().now();
            if now >= deadline {
                // Fires once; the next gold window re-arms it.
                self.armed_deadline = None;
                self.spawn_wave(world);
            }
        }
        self.update_falling_entities(world, dt);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
