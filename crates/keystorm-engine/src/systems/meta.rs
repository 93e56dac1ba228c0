//! Reset choreography and read-only overlays.
//!
//! `GameReset` is the one event the scheduler delivers synchronously
//! (immediate dispatch): by the time any other system sees the event, the
//! world is already empty and the cursor re-created, so no system ever
//! observes a frame with mixed pre/post-reset state. The meta system runs at
//! the lowest priority, which makes it the first subscriber in the immediate
//! fan-out; the other systems' own `GameReset` handlers then drop their
//! session state.
//!
//! `DebugRequest` / `HelpRequest` compose overlay strings from the status
//! registry and per-store counts into the [`OverlayState`] resource for the
//! renderer to pick up.

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::fmt::Write as _;

use keystorm_ecs::world::World;

use crate::audio::{AudioHandle, AudioKind};
use crate::clock::TimeResource;
use crate::cursor::{spawn_cursor, CursorState};
use crate::config::GameConfig;
use crate::event::{Event, EventKind, EventQueue};
use crate::schedule::System;
use crate::status::{StatusRegistry, KEY_GRAYOUT_STARTED_US};
use crate::systems::gold::GoldState;
use crate::world_setup::SequenceIdGen;

/// Meta system priority; lowest, so reset fan-out reaches it first.
pub const META_PRIORITY: i32 = 0;

// ---------------------------------------------------------------------------
// OverlayState
// ---------------------------------------------------------------------------

/// Composed overlay strings for the renderer.
pub struct OverlayState {
    debug: Mutex<Option<String>>,
    help: Mutex<Option<String>>,
}

impl OverlayState {
    pub fn new() -> Self {
        Self {
            debug: Mutex::new(None),
            help: Mutex::new(None),
        }
    }

    pub fn set_debug(&self, text: Option<String>) {
        *self.debug.lock() = text;
    }

    pub fn debug(&self) -> Option<String> {
        self.debug.lock().clone()
    }

    pub fn set_help(&self, text: Option<String>) {
        *self.help.lock() = text;
    }

    pub fn help(&self) -> Option<String> {
        self.help.lock().clone()
    }

    pub fn clear(&self) {
        *self.debug.lock() = None;
        *self.help.lock() = None;
    }
}

impl Default for OverlayState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// ResetSignal
// ---------------------------------------------------------------------------

/// One-slot wake-up channel for the (external) spawner FSM.
///
/// The reset choreography fires it as its last step; the spawner begins a new
/// session on its next poll. A pending, not-yet-consumed signal is collapsed
/// with the new one.
pub struct ResetSignal {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl ResetSignal {
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    /// Signal a reset. No-op if a signal is already pending.
    pub fn notify(&self) {
        let _ = self.tx.try_send(());
    }

    /// Consume a pending signal, if any.
    pub fn try_take(&self) -> bool {
        self.rx.try_recv().is_ok()
    }
}

impl Default for ResetSignal {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// MetaSystem
// ---------------------------------------------------------------------------

pub struct MetaSystem;

impl MetaSystem {
    pub fn new() -> Self {
        Self
    }

    /// The five reset steps, in order.
    fn run_reset(world: &World) {
        let config = world.resources().must_get::<GameConfig>();
        let now = world.resources().must_get::<TimeResource>().now();

        // 1. Stop audio.
        if let Some(audio) = world.resources().get::<AudioHandle>() {
            audio.send_real_time(AudioKind::StopAll, u8::MAX, now);
        }

        // 2. Destroy all entities.
        world.clear();

        // 3. Reset counters, timers, next-sequence-id. (Each system's own
        //    GameReset handler drops its session state right after this.)
        world.resources().must_get::<SequenceIdGen>().reset();
        world.resources().must_get::<GoldState>().clear();
        let status = world.resources().must_get::<StatusRegistry>();
        status.set_counter(KEY_GRAYOUT_STARTED_US, 0);
        world.resources().must_get::<OverlayState>().clear();

        // 4. Recreate the cursor.
        spawn_cursor(world, &config);

        // 5. Wake the spawner FSM.
        world.resources().must_get::<ResetSignal>().notify();

        tracing::info!("world reset complete");
    }

    fn compose_debug(world: &World, frame: u64) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "frame {frame}");
        let cursor = world.resources().must_get::<CursorState>();
        let (x, y) = cursor.pos();
        let _ = writeln!(out, "cursor ({x}, {y}) score {}", cursor.score());
        let _ = writeln!(out, "entities {}", world.entity_count());
        for (name, count) in world.store_counts() {
            if count > 0 {
                let _ = writeln!(out, "  {name}: {count}");
            }
        }
        for (key, value) in world.resources().must_get::<StatusRegistry>().snapshot() {
            let _ = writeln!(out, "{key} = {value}");
        }
        out
    }

    fn compose_help() -> String {
        let mut out = String::new();
        let _ = writeln!(out, ":q            quit");
        let _ = writeln!(out, ":n            new game");
        let _ = writeln!(out, ":energy N     set energy");
        let _ = writeln!(out, ":heat N       set heat");
        let _ = writeln!(out, ":boost        toggle boost");
        let _ = writeln!(out, ":spawn on/off toggle spawner");
        let _ = writeln!(out, ":d            debug overlay");
        let _ = writeln!(out, ":h            this help");
        out
    }
}

impl Default for MetaSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for MetaSystem {
    fn name(&self) -> &'static str {
        "meta"
    }

    fn priority(&self) -> i32 {
        META_PRIORITY
    }

    fn event_kinds(&self) -> &[EventKind] {
        &[
            EventKind::GameReset,
            EventKind::DebugRequest,
            EventKind::HelpRequest,
        ]
    }

    fn handle_event(&mut self, world: &World, _events: &EventQueue, event: &Event) {
        match event.kind {
            EventKind::GameReset => Self::run_reset(world),
            EventKind::DebugRequest => {
                let overlay = world.resources().must_get::<OverlayState>();
                overlay.set_debug(Some(Self::compose_debug(world, event.frame)));
            }
            EventKind::HelpRequest => {
                let overlay = world.resources().must_get::<OverlayState>();
                overlay.set_help(Some(Self::compose_help()));
            }
            _ => {}
        }
    }

    fn update(&mut self, _world: &World, _events: &EventQueue, _dt: f64) {}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, MockClock};
    use crate::components::{Character, Sequence, SequenceColor, SequenceLevel, StyleId};
    use crate::world_setup::build_world;
    use std::sync::Arc;

    fn setup() -> (World, MetaSystem, EventQueue) {
        let config = GameConfig::default();
        let world = build_world(&config);
        world
            .resources()
            .insert(TimeResource(Arc::new(MockClock::new()) as Arc<dyn Clock>));
        spawn_cursor(&world, &config);
        (world, MetaSystem::new(), EventQueue::new())
    }

    fn place_target(world: &World, x: i32, y: i32) {
        let e = world.create_entity();
        world.store::<Character>().insert(
            e,
            Character {
                glyph: 'a',
                style: StyleId(0),
            },
        );
        world.store::<Sequence>().insert(
            e,
            Sequence {
                id: world.resources().must_get::<SequenceIdGen>().next_id(),
                index: 0,
                color: SequenceColor::Green,
                level: SequenceLevel::Bright,
            },
        );
        world.spatial().spawn(e, x, y);
    }

    #[test]
    fn reset_leaves_only_the_cursor() {
        let (world, mut system, events) = setup();
        for i in 0..10 {
            place_target(&world, i, 3);
        }
        let old_cursor = world.resources().must_get::<CursorState>().entity();
        assert_eq!(world.entity_count(), 11);

        system.handle_event(&world, &events, &Event::new(EventKind::GameReset));

        assert_eq!(world.entity_count(), 1, "only the fresh cursor remains");
        let new_cursor = world.resources().must_get::<CursorState>().entity();
        assert_ne!(new_cursor, old_cursor);
        assert!(world.is_alive(new_cursor));
        assert!(!world.is_alive(old_cursor));

        // Every store except the cursor's own components is empty.
        for (name, count) in world.store_counts() {
            match name.as_str() {
                "position" | "heat" | "energy" | "shield" | "boost" => {
                    assert_eq!(count, 1, "{name} holds only the cursor")
                }
                _ => assert_eq!(count, 0, "{name} must be empty after reset"),
            }
        }
    }

    #[test]
    fn reset_rewinds_sequence_ids_and_signals_spawner() {
        let (world, mut system, events) = setup();
        let ids = world.resources().must_get::<SequenceIdGen>();
        ids.next_id();
        ids.next_id();

        let signal = world.resources().must_get::<ResetSignal>();
        assert!(!signal.try_take());

        system.handle_event(&world, &events, &Event::new(EventKind::GameReset));

        assert_eq!(ids.next_id(), 1);
        assert!(signal.try_take());
        assert!(!signal.try_take(), "signal is one-shot");
    }

    #[test]
    fn reset_signal_collapses_duplicates() {
        let signal = ResetSignal::new();
        signal.notify();
        signal.notify();
        assert!(signal.try_take());
        assert!(!signal.try_take());
    }

    #[test]
    fn debug_overlay_reports_counts() {
        let (world, mut system, events) = setup();
        place_target(&world, 4, 4);
        world
            .resources()
            .must_get::<StatusRegistry>()
            .incr("cleaner.spawned", 3);

        let mut event = Event::new(EventKind::DebugRequest);
        event.frame = 42;
        system.handle_event(&world, &events, &event);

        let overlay = world.resources().must_get::<OverlayState>();
        let text = overlay.debug().unwrap();
        assert!(text.contains("frame 42"));
        assert!(text.contains("character: 1"));
        assert!(text.contains("cleaner.spawned = 3"));
    }

    #[test]
    fn help_overlay_lists_commands() {
        let (world, mut system, events) = setup();
        system.handle_event(&world, &events, &Event::new(EventKind::HelpRequest));
        let overlay = world.resources().must_get::<OverlayState>();
        let text = overlay.help().unwrap();
        assert!(text.contains(":q"));
        assert!(text.contains(":energy"));
    }
}
