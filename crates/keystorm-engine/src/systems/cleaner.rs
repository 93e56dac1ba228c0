//! Cleaner projectiles.
//!
//! A cleaner sweeps a row (or, in directional mode, a row and a column in all
//! four directions) and destroys every Red target in its path. Collision is
//! swept: every integer cell crossed during the tick is tested, so a fast
//! cleaner cannot tunnel through a target.
//!
//! Request handling deduplicates on the event's frame tag -- a `CleanerRequest`
//! repeated within the dedup window spawns nothing extra. The whoosh audio
//! command fires only when cleaners actually spawn; a request with no Red
//! targets on the grid emits `CleanerFinished` immediately so downstream UI
//! effects still run.

use std::collections::HashSet;

use keystorm_ecs::world::World;

use crate::audio::{AudioHandle, AudioKind};
use crate::clock::TimeResource;
use crate::components::{Character, Cleaner, GridPoint, Sequence, SequenceColor};
use crate::config::GameConfig;
use crate::event::{Event, EventKind, EventQueue};
use crate::schedule::System;
use crate::status::{StatusRegistry, KEY_CLEANERS_SPAWNED, KEY_PAYLOAD_MISMATCH};
use crate::systems::flash::spawn_destruction_flash;

/// Cleaner system priority.
pub const CLEANER_PRIORITY: i32 = 40;

/// Glyph drawn for the projectile head.
const CLEANER_GLYPH: char = '█';

// ---------------------------------------------------------------------------
// CleanerSystem
// ---------------------------------------------------------------------------

pub struct CleanerSystem {
    /// Frames for which a row-sweep request was already honored.
    handled_frames: HashSet<u64>,
    /// Set once any cleaner spawns; cleared when the last one dies (and
    /// `CleanerFinished` is emitted).
    has_spawned: bool,
}

impl CleanerSystem {
    pub fn new() -> Self {
        Self {
            handled_frames: HashSet::new(),
            has_spawned: false,
        }
    }

    // -- spawning ------------------------------------------------------------

    /// Rows currently holding at least one Red target.
    fn red_rows(world: &World) -> Vec<i32> {
        let sequences = world.store::<Sequence>();
        let mut rows: Vec<i32> = sequences
            .iter_snapshot()
            .into_iter()
            .filter(|(_, s)| s.color == SequenceColor::Red)
            .filter_map(|(e, _)| world.position_of(e).map(|p| p.y))
            .collect();
        rows.sort_unstable();
        rows.dedup();
        rows
    }

    fn spawn_cleaner(world: &World, cleaner: Cleaner) {
        let entity = world.create_entity();
        world.store::<Cleaner>().insert(entity, cleaner);
    }

    fn make_cleaner(x: f64, y: f64, vx: f64, vy: f64, target_x: f64, target_y: f64) -> Cleaner {
        let grid_x = x.floor() as i32;
        let grid_y = y.floor() as i32;
        Cleaner {
            precise_x: x,
            precise_y: y,
            vx,
            vy,
            target_x,
            target_y,
            grid_x,
            grid_y,
            trail: std::sync::Arc::from(vec![GridPoint { x: grid_x, y: grid_y }].into_boxed_slice()),
            glyph: CLEANER_GLYPH,
        }
    }

    /// Row-sweep mode: one cleaner per Red row, direction alternating by row
    /// parity. Returns how many cleaners spawned.
    fn spawn_row_sweep(&mut self, world: &World, events: &EventQueue, frame: u64) -> usize {
        let config = world.resources().must_get::<GameConfig>();

        if !self.handled_frames.insert(frame) {
            tracing::trace!(frame, "cleaner request deduplicated");
            return 0;
        }

        let rows = Self::red_rows(world);
        if rows.is_empty() {
            // Phantom trigger: nothing to clean, but downstream effects still
            // want the finish signal.
            events.push(Event::new(EventKind::CleanerFinished));
            return 0;
        }

        let width = config.width as f64;
        let margin = config.cleaner_trail_length as f64;
        let speed = config.cleaner_speed_x();
        for row in &rows {
            let y = *row as f64;
            let cleaner = if row % 2 == 1 {
                // Odd row: left to right.
                Self::make_cleaner(-margin, y, speed, 0.0, width + margin, y)
            } else {
                // Even row: right to left.
                Self::make_cleaner(width - 1.0 + margin, y, -speed, 0.0, -margin, y)
            };
            Self::spawn_cleaner(world, cleaner);
        }

        self.after_spawn(world, rows.len());
        rows.len()
    }

    /// Directional mode: four cleaners outward from an origin cell.
    fn spawn_directional(&mut self, world: &World, origin_x: i32, origin_y: i32) {
        let config = world.resources().must_get::<GameConfig>();
        let (x, y) = (origin_x as f64, origin_y as f64);
        let margin = config.cleaner_trail_length as f64;
        let sx = config.cleaner_speed_x();
        let sy = config.cleaner_speed_y();
        let width = config.width as f64;
        let height = config.height as f64;

        let cleaners = [
            Self::make_cleaner(x, y, sx, 0.0, width + margin, y),
            Self::make_cleaner(x, y, -sx, 0.0, -margin, y),
            Self::make_cleaner(x, y, 0.0, sy, x, height + margin),
            Self::make_cleaner(x, y, 0.0, -sy, x, -margin),
        ];
        for cleaner in cleaners {
            Self::spawn_cleaner(world, cleaner);
        }

        self.after_spawn(world, 4);
    }

    fn after_spawn(&mut self, world: &World, count: usize) {
        self.has_spawned = true;
        let status = world.resources().must_get::<StatusRegistry>();
        status.incr(KEY_CLEANERS_SPAWNED, count as i64);

        let now = world.resources().must_get::<TimeResource>().now();
        if let Some(audio) = world.resources().get::<AudioHandle>() {
            audio.send_real_time(AudioKind::Whoosh, 2, now);
        }
        tracing::debug!(count, "cleaners spawned");
    }

    // -- collision -----------------------------------------------------------

    /// Destroy every Red target at the cell, spawning a flash per victim.
    fn check_and_destroy_at(world: &World, x: i32, y: i32) {
        let sequences = world.store::<Sequence>();
        let characters = world.store::<Character>();
        // Copied slice: safe to keep iterating while victims are destroyed.
        for entity in world.spatial().get_all_at(x, y) {
            let Some(sequence) = sequences.get(entity) else {
                continue;
            };
            if sequence.color != SequenceColor::Red {
                continue;
            }
            let glyph = characters.get(entity).map_or('*', |c| c.glyph);
            spawn_destruction_flash(world, x, y, glyph);
            world.destroy_entity(entity);
        }
    }

    /// Sweep every integer cell crossed on the motion axis this tick.
    fn sweep(world: &World, config: &GameConfig, cleaner: &Cleaner, prev_x: f64, prev_y: f64) {
        if cleaner.vx != 0.0 {
            let from = prev_x.min(cleaner.precise_x).floor() as i32;
            let to = prev_x.max(cleaner.precise_x).floor() as i32;
            let y = cleaner.precise_y.floor() as i32;
            if y < 0 || y >= config.height {
                return;
            }
            for x in from.max(0)..=to.min(config.width - 1) {
                Self::check_and_destroy_at(world, x, y);
            }
        } else if cleaner.vy != 0.0 {
            let from = prev_y.min(cleaner.precise_y).floor() as i32;
            let to = prev_y.max(cleaner.precise_y).floor() as i32;
            let x = cleaner.precise_x.floor() as i32;
            if x < 0 || x >= config.width {
                return;
            }
            for y in from.max(0)..=to.min(config.height - 1) {
                Self::check_and_destroy_at(world, x, y);
            }
        }
    }

    fn past_target(cleaner: &Cleaner) -> bool {
        (cleaner.vx > 0.0 && cleaner.precise_x >= cleaner.target_x)
            || (cleaner.vx < 0.0 && cleaner.precise_x <= cleaner.target_x)
            || (cleaner.vy > 0.0 && cleaner.precise_y >= cleaner.target_y)
            || (cleaner.vy < 0.0 && cleaner.precise_y <= cleaner.target_y)
    }

    fn finish_if_drained(&mut self, world: &World, events: &EventQueue) {
        if self.has_spawned && world.store::<Cleaner>().is_empty() {
            self.has_spawned = false;
            events.push(Event::new(EventKind::CleanerFinished));
            tracing::debug!("all cleaners finished");
        }
    }
}

impl Default for CleanerSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for CleanerSystem {
    fn name(&self) -> &'static str {
        "cleaner"
    }

    fn priority(&self) -> i32 {
        CLEANER_PRIORITY
    }

    fn event_kinds(&self) -> &[EventKind] {
        &[
            EventKind::CleanerRequest,
            EventKind::DirectionalCleanerRequest,
            EventKind::GameReset,
        ]
    }

    fn handle_event(&mut self, world: &World, events: &EventQueue, event: &Event) {
        match event.kind {
            EventKind::CleanerRequest => {
                self.spawn_row_sweep(world, events, event.frame);
            }
            EventKind::DirectionalCleanerRequest => match event.payload.origin() {
                Some((x, y)) => self.spawn_directional(world, x, y),
                None => {
                    world
                        .resources()
                        .must_get::<StatusRegistry>()
                        .incr(KEY_PAYLOAD_MISMATCH, 1);
                }
            },
            EventKind::GameReset => {
                self.handled_frames.clear();
                self.has_spawned = false;
            }
            _ => {}
        }
    }

    fn update(&mut self, world: &World, events: &EventQueue, dt: f64) {
        let config = world.resources().must_get::<GameConfig>();

        // Prune dedup keys that fell out of the window.
        let current = events.current_frame();
        self.handled_frames
            .retain(|&frame| current.saturating_sub(frame) <= config.cleaner_dedup_window);

        self.finish_if_drained(world, events);

        let cleaners = world.store::<Cleaner>();
        for (entity, mut cleaner) in cleaners.iter_snapshot() {
            let prev_x = cleaner.precise_x;
            let prev_y = cleaner.precise_y;
            cleaner.precise_x += cleaner.vx * dt;
            cleaner.precise_y += cleaner.vy * dt;

            Self::sweep(world, &config, &cleaner, prev_x, prev_y);

            let grid_x = cleaner.precise_x.floor() as i32;
            let grid_y = cleaner.precise_y.floor() as i32;
            if (grid_x, grid_y) != (cleaner.grid_x, cleaner.grid_y) {
                cleaner.grid_x = grid_x;
                cleaner.grid_y = grid_y;
                cleaner.push_trail(
                    GridPoint { x: grid_x, y: grid_y },
                    config.cleaner_trail_length,
                );
            }

            if Self::past_target(&cleaner) {
                world.destroy_entity(entity);
            } else {
                cleaners.insert(entity, cleaner);
            }
        }

        self.finish_if_drained(world, events);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
