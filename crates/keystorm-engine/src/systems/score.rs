//! Typing, scoring, heat, and boost.
//!
//! [`handle_character_typing`] is the direct entry point the input layer
//! calls for every typed rune. It is a state machine over the cursor's heat
//! and boost cells:
//!
//! - miss (empty cell or wrong rune): error flash, heat to 0, boost cleared;
//! - gold target: delegated to the gold handler, no normal scoring;
//! - hit: heat climbs (double step under a color-matched boost), points are
//!   `heat x level multiplier` (negated for Red, doubled under the trail
//!   effect), Red zeroes heat and clears the boost, Blue extends the trail
//!   effect, and reaching max heat arms / extends / rebuilds the boost.
//!
//! The [`ScoreSystem`] runs the per-tick side: the atomic boost expiry poll
//! and movement-trail marker aging.

use std::time::Duration;

use keystorm_ecs::world::World;

use crate::audio::{AudioHandle, AudioKind};
use crate::clock::TimeResource;
use crate::components::{
    Boost, Character, Heat, Sequence, SequenceColor, TrailMarker,
};
use crate::config::GameConfig;
use crate::cursor::CursorState;
use crate::event::{EventKind, EventQueue};
use crate::schedule::System;
use crate::systems::gold;

/// Score system priority.
pub const SCORE_PRIORITY: i32 = 10;

// ---------------------------------------------------------------------------
// Typing entry point
// ---------------------------------------------------------------------------

/// Process one typed rune aimed at grid cell `(x, y)`.
pub fn handle_character_typing(world: &World, events: &EventQueue, x: i32, y: i32, typed: char) {
    let config = world.resources().must_get::<GameConfig>();
    let cursor = world.resources().must_get::<CursorState>();
    let now = world.resources().must_get::<TimeResource>().now();

    let characters = world.store::<Character>();
    let sequences = world.store::<Sequence>();

    // Topmost typed-target at the cell.
    let target = world
        .spatial()
        .get_all_at(x, y)
        .into_iter()
        .rev()
        .find(|&e| characters.contains(e));

    let cursor_entity = cursor.entity();
    let heat = world.store::<Heat>().get(cursor_entity);
    let boost = world.store::<Boost>().get(cursor_entity);

    let miss = |heat: &Option<Heat>, boost: &Option<Boost>| {
        cursor.flash_error(now, Duration::from_secs_f64(config.error_blink_secs));
        if let Some(heat) = heat {
            heat.reset();
        }
        if let Some(boost) = boost {
            boost.clear();
        }
    };

    let Some(target) = target else {
        miss(&heat, &boost);
        return;
    };
    let Some(character) = characters.get(target) else {
        miss(&heat, &boost);
        return;
    };
    if character.glyph != typed {
        miss(&heat, &boost);
        return;
    }
    let Some(sequence) = sequences.get(target) else {
        miss(&heat, &boost);
        return;
    };

    // Gold glyphs score through their own handler.
    if world.store::<crate::components::Nugget>().contains(target) {
        gold::handle_gold_typing(world, events, target);
        return;
    }

    let (Some(heat), Some(boost)) = (heat, boost) else {
        return;
    };

    let level_multiplier = sequence.level.multiplier();
    let heat_increment =
        if boost.is_active() && boost.color() == Some(sequence.color) {
            2
        } else {
            1
        };
    let new_heat = heat.add_clamped(heat_increment, config.max_heat);

    // The trail effect state as of this keystroke; a Blue extension below
    // must not retroactively affect this hit.
    let trail_active = cursor.trail_active(now);

    let mut points = new_heat * level_multiplier;
    if sequence.color == SequenceColor::Red {
        points = -points;
    }
    if trail_active {
        points *= 2;
    }
    cursor.add_score(points);

    match sequence.color {
        SequenceColor::Red => {
            // Red burns the streak: heat and boost both reset.
            heat.reset();
            boost.clear();
        }
        SequenceColor::Blue => {
            cursor.extend_trail(
                now,
                Duration::from_secs_f64(config.trail_effect_extension_secs),
            );
        }
        _ => {}
    }

    if new_heat == config.max_heat && sequence.color != SequenceColor::Red {
        let deadline = now + Duration::from_secs_f64(config.boost_extension_secs);
        if !boost.is_active() {
            boost.arm(sequence.color, deadline);
        } else if boost.color() == Some(sequence.color) {
            boost.extend_to(deadline);
        } else {
            // Rebuild path: keep heat, drop the window, re-lock the color.
            boost.clear();
            boost.set_color(Some(sequence.color));
        }
    }

    // Movement trail: drop a marker where the cursor was.
    if trail_active {
        let (old_x, old_y) = cursor.pos();
        let marker = world.create_entity();
        world.store::<TrailMarker>().insert(
            marker,
            TrailMarker {
                intensity: 1.0,
                timestamp: now,
            },
        );
        world.spatial().spawn(marker, old_x, old_y);
    }

    world.destroy_entity(target);
    cursor.advance_column(config.width);
    cursor.set_blink(
        sequence.color.blink_code(),
        now,
        Duration::from_secs_f64(config.score_blink_secs),
    );

    if let Some(audio) = world.resources().get::<AudioHandle>() {
        audio.send_real_time(AudioKind::Impact, 1, now);
    }
    tracing::trace!(%target, ?sequence.color, new_heat, points, "target typed");
}

// ---------------------------------------------------------------------------
// ScoreSystem
// ---------------------------------------------------------------------------

/// Per-tick boost expiry and trail-marker aging.
pub struct ScoreSystem;

impl ScoreSystem {
    pub fn new() -> Self {
        Self
    }

    /// Atomic boost expiry poll. Exposed for the scheduler-independent tests.
    pub fn update_boost_timer(world: &World) {
        let cursor = world.resources().must_get::<CursorState>().entity();
        let now = world.resources().must_get::<TimeResource>().now();
        if let Some(boost) = world.store::<Boost>().get(cursor) {
            if boost.expire_if_past(now) {
                tracing::debug!("boost expired");
            }
        }
    }
}

impl Default for ScoreSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ScoreSystem {
    fn name(&self) -> &'static str {
        "score"
    }

    fn priority(&self) -> i32 {
        SCORE_PRIORITY
    }

    fn event_kinds(&self) -> &[EventKind] {
        &[EventKind::GameReset]
    }

    fn handle_event(
        &mut self,
        world: &World,
        _events: &EventQueue,
        event: &crate::event::Event,
    ) {
        if event.kind == EventKind::GameReset {
            let cursor = world.resources().must_get::<CursorState>();
            cursor.reset_score();
            cursor.clear_effects();
        }
    }

    fn update(&mut self, world: &World, _events: &EventQueue, _dt: f64) {
        Self::update_boost_timer(world);

        // Age out movement-trail markers.
        let config = world.resources().must_get::<GameConfig>();
        let now = world.resources().must_get::<TimeResource>().now();
        let lifetime = Duration::from_secs_f64(config.trail_marker_lifetime_secs);
        let markers = world.store::<TrailMarker>();
        for (entity, marker) in markers.iter_snapshot() {
            let age = now.saturating_sub(marker.timestamp);
            if age >= lifetime {
                world.destroy_entity(entity);
            } else {
                let intensity =
                    1.0 - (age.as_secs_f64() / lifetime.as_secs_f64()) as f32;
                markers.update(entity, |m| m.intensity = intensity.max(f32::EPSILON));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
