//! End-to-end world scenarios: gold windows, decay arming, reset atomicity,
//! shield drain, and flash lifecycles through the full simulation.

use std::sync::Arc;
use std::time::Duration;

use keystorm_engine::prelude::*;
use keystorm_engine::systems::meta::ResetSignal;

const DT: Duration = Duration::from_millis(16);

struct Harness {
    sim: Simulation,
    clock: Arc<MockClock>,
}

fn harness() -> Harness {
    let clock = Arc::new(MockClock::new());
    let sim = Simulation::with_clock(GameConfig::default(), clock.clone()).unwrap();
    Harness { sim, clock }
}

impl Harness {
    fn step(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.clock.advance(DT);
            self.sim.tick();
        }
    }

    fn place_green(&self, x: i32, y: i32) -> EntityId {
        let world = self.sim.world();
        let e = world.create_entity();
        world.store::<Character>().insert(
            e,
            Character {
                glyph: 'g',
                style: StyleId(0),
            },
        );
        world.store::<Sequence>().insert(
            e,
            Sequence {
                id: 1,
                index: 0,
                color: SequenceColor::Green,
                level: SequenceLevel::Bright,
            },
        );
        world.spatial().spawn(e, x, y);
        e
    }

    fn cursor(&self) -> Arc<CursorState> {
        self.sim.world().resources().must_get::<CursorState>()
    }

    fn heat(&self) -> Heat {
        let cursor = self.cursor().entity();
        self.sim.world().store::<Heat>().get(cursor).unwrap()
    }

    fn gold_glyphs(&self) -> Vec<(EntityId, Nugget, char)> {
        let world = self.sim.world();
        let characters = world.store::<Character>();
        let mut glyphs: Vec<(EntityId, Nugget, char)> = world
            .store::<Nugget>()
            .iter_snapshot()
            .into_iter()
            .map(|(e, n)| (e, n, characters.get(e).unwrap().glyph))
            .collect();
        glyphs.sort_by_key(|(_, n, _)| n.order);
        glyphs
    }
}

// ---------------------------------------------------------------------------
// S5: gold timeout arms decay
// ---------------------------------------------------------------------------

#[test]
fn s5_gold_timeout_arms_decay_at_slow_interval() {
    let mut h = harness();
    h.place_green(10, 5);
    h.place_green(30, 12);

    assert!(h.sim.spawn_gold());
    assert!(!h.sim.world().store::<Nugget>().is_empty());

    // t = 10.1s: the window lapses, the remaining gold glyphs vanish.
    h.clock.set(Duration::from_secs_f64(10.1));
    h.sim.tick();
    assert!(h.sim.world().store::<Nugget>().is_empty());

    // Next tick delivers GoldExpired to the decay system; heat is 0 so the
    // interval is the slow end (60s).
    h.step(1);
    assert!(h.sim.world().store::<FallingDecay>().is_empty());

    // Just before the interval elapses: still nothing.
    h.clock.set(Duration::from_secs_f64(70.0));
    h.sim.tick();
    assert!(h.sim.world().store::<FallingDecay>().is_empty());

    // Past it: one drop per column holding a sequence target.
    h.clock.set(Duration::from_secs_f64(70.3));
    h.sim.tick();
    let drops = h.sim.world().store::<FallingDecay>();
    let mut columns: Vec<i32> = drops.iter_snapshot().iter().map(|(_, d)| d.column).collect();
    columns.sort_unstable();
    assert_eq!(columns, vec![10, 30]);

    let status = h.sim.world().resources().must_get::<StatusRegistry>();
    assert_eq!(status.counter("decay.waves"), 1);
}

// ---------------------------------------------------------------------------
// Gold completion
// ---------------------------------------------------------------------------

#[test]
fn gold_completion_maxes_heat_and_arms_decay() {
    let mut h = harness();
    let config = GameConfig::default();
    h.place_green(40, 20);

    assert!(h.sim.spawn_gold());
    h.step(1);

    // Type the word in order through the real typing surface.
    for (entity, _, glyph) in h.gold_glyphs() {
        let pos = h.sim.world().position_of(entity).unwrap();
        h.sim.handle_character_typing(pos.x, pos.y, glyph);
    }

    assert_eq!(h.heat().load(), config.max_heat);
    assert!(h.sim.world().store::<Nugget>().is_empty());

    // GoldExpired flows to the decay system on the next tick; with heat at
    // max the interval is the fast end (10s).
    h.step(1);
    let before = h.sim.now();
    h.clock.set(before + Duration::from_secs_f64(10.1));
    h.sim.tick();
    assert_eq!(h.sim.world().store::<FallingDecay>().len(), 1);
}

// ---------------------------------------------------------------------------
// Reset atomicity
// ---------------------------------------------------------------------------

#[test]
fn reset_leaves_empty_stores_and_fresh_cursor() {
    let mut h = harness();
    for i in 0..20 {
        h.place_green(i * 3, (i * 5) % 24);
    }
    h.sim.spawn_gold();
    h.sim.push_event(Event::with_payload(
        EventKind::FlashRequest,
        EventPayload::Flash {
            x: 1,
            y: 1,
            glyph: '*',
        },
    ));
    h.step(3);
    h.heat().store_clamped(50, 80);
    h.cursor().add_score(1234);

    let old_cursor = h.cursor().entity();
    h.sim.request_reset();

    // Every store is empty except the cursor's own components.
    for (name, count) in h.sim.world().store_counts() {
        match name.as_str() {
            "position" | "heat" | "energy" | "shield" | "boost" => {
                assert_eq!(count, 1, "{name} holds only the cursor")
            }
            _ => assert_eq!(count, 0, "{name} not empty after reset"),
        }
    }
    let new_cursor = h.cursor().entity();
    assert_ne!(new_cursor, old_cursor);
    assert_eq!(h.cursor().score(), 0);
    assert_eq!(h.heat().load(), 0, "fresh cursor carries fresh heat");
    assert!(
        h.sim
            .world()
            .resources()
            .must_get::<ResetSignal>()
            .try_take(),
        "spawner FSM signaled"
    );

    // The world keeps ticking cleanly after the reset.
    h.step(5);
    assert_eq!(h.sim.world().entity_count(), 1);
}

#[test]
fn events_queued_before_reset_are_harmless_after() {
    let mut h = harness();
    let target = h.place_green(5, 5);
    // A cleaner request is in flight when the reset lands.
    h.sim.push_event(Event::new(EventKind::CleanerRequest));
    h.sim.request_reset();
    h.step(2);

    assert!(!h.sim.world().is_alive(target));
    assert_eq!(h.sim.world().entity_count(), 1, "only the cursor");
}

// ---------------------------------------------------------------------------
// Shield drain through the loop
// ---------------------------------------------------------------------------

#[test]
fn shield_drains_energy_on_interval() {
    let mut h = harness();
    let cursor = h.cursor().entity();
    let energy = h.sim.world().store::<Energy>().get(cursor).unwrap();
    energy.store(10);

    h.sim.push_event(Event::new(EventKind::ShieldActivate));
    h.step(1);
    assert!(h
        .sim
        .world()
        .store::<Shield>()
        .get(cursor)
        .unwrap()
        .is_active());

    // ~2.1s: two passive drain intervals -> two EnergyAdd(-1) applied.
    h.step(130);
    assert_eq!(energy.load(), 8);

    h.sim.push_event(Event::new(EventKind::ShieldDeactivate));
    h.step(1);
    let level = energy.load();
    h.step(200);
    assert_eq!(energy.load(), level, "no drain while inactive");
}

// ---------------------------------------------------------------------------
// Flash lifecycle through the loop
// ---------------------------------------------------------------------------

#[test]
fn flash_request_spawns_and_expires() {
    let mut h = harness();
    h.sim.push_event(Event::with_payload(
        EventKind::FlashRequest,
        EventPayload::Flash {
            x: 8,
            y: 8,
            glyph: '*',
        },
    ));
    h.step(1);
    assert_eq!(h.sim.world().store::<Flash>().len(), 1);
    let snapshot = h.sim.snapshots().latest();
    assert_eq!(snapshot.flashes.len(), 1);
    assert_eq!((snapshot.flashes[0].x, snapshot.flashes[0].y), (8, 8));

    // Past the 300ms lifetime.
    h.step(25);
    assert_eq!(h.sim.world().store::<Flash>().len(), 0);
}

// ---------------------------------------------------------------------------
// Overlays
// ---------------------------------------------------------------------------

#[test]
fn debug_and_help_overlays_compose() {
    let mut h = harness();
    h.place_green(4, 4);
    h.sim.push_event(Event::new(EventKind::DebugRequest));
    h.sim.push_event(Event::new(EventKind::HelpRequest));
    h.step(1);

    let overlay = h
        .sim
        .world()
        .resources()
        .must_get::<keystorm_engine::systems::meta::OverlayState>();
    let debug = overlay.debug().unwrap();
    assert!(debug.contains("sequence: 1"));
    assert!(overlay.help().unwrap().contains(":heat"));
}
