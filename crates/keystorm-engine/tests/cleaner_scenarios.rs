//! End-to-end cleaner scenarios.
//!
//! Drives a full [`Simulation`] on a mock clock: 80x24 grid, 16ms ticks,
//! 1s cleaner traversal. Covers the row-sweep basics, the no-target phantom
//! trigger, the 4-way directional burst, anti-tunneling under a giant tick,
//! and same-frame request idempotence.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use keystorm_engine::prelude::*;

const DT: Duration = Duration::from_millis(16);

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Records every event kind it sees; subscribe it to whatever the test needs.
struct EventProbe {
    kinds: &'static [EventKind],
    seen: Arc<Mutex<Vec<EventKind>>>,
}

impl System for EventProbe {
    fn name(&self) -> &'static str {
        "event-probe"
    }
    fn priority(&self) -> i32 {
        1000
    }
    fn event_kinds(&self) -> &[EventKind] {
        self.kinds
    }
    fn handle_event(&mut self, _world: &World, _events: &EventQueue, event: &Event) {
        self.seen.lock().unwrap().push(event.kind);
    }
    fn update(&mut self, _world: &World, _events: &EventQueue, _dt: f64) {}
}

struct Harness {
    sim: Simulation,
    clock: Arc<MockClock>,
    finished: Arc<Mutex<Vec<EventKind>>>,
    audio: crossbeam_channel::Receiver<AudioCommand>,
}

fn harness() -> Harness {
    let clock = Arc::new(MockClock::new());
    let mut sim = Simulation::with_clock(GameConfig::default(), clock.clone()).unwrap();
    let finished = Arc::new(Mutex::new(Vec::new()));
    sim.register_system(Box::new(EventProbe {
        kinds: &[EventKind::CleanerFinished],
        seen: Arc::clone(&finished),
    }));
    let audio = sim.take_audio_receiver().unwrap();
    Harness {
        sim,
        clock,
        finished,
        audio,
    }
}

impl Harness {
    fn step(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.clock.advance(DT);
            self.sim.tick();
        }
    }

    fn finished_count(&self) -> usize {
        self.finished
            .lock()
            .unwrap()
            .iter()
            .filter(|&&k| k == EventKind::CleanerFinished)
            .count()
    }

    fn place_red(&self, x: i32, y: i32) -> EntityId {
        let world = self.sim.world();
        let e = world.create_entity();
        world.store::<Character>().insert(
            e,
            Character {
                glyph: 'x',
                style: StyleId(0),
            },
        );
        world.store::<Sequence>().insert(
            e,
            Sequence {
                id: 99,
                index: 0,
                color: SequenceColor::Red,
                level: SequenceLevel::Normal,
            },
        );
        world.spatial().spawn(e, x, y);
        e
    }

    fn cleaner_count(&self) -> usize {
        self.sim.world().store::<Cleaner>().len()
    }

    fn whoosh_count(&self) -> usize {
        let mut count = 0;
        while let Ok(cmd) = self.audio.try_recv() {
            if cmd.kind == AudioKind::Whoosh {
                count += 1;
            }
        }
        count
    }
}

// ---------------------------------------------------------------------------
// S1: row-sweep basic
// ---------------------------------------------------------------------------

#[test]
fn s1_row_sweep_destroys_red_and_finishes_once() {
    let mut h = harness();
    let red = h.place_red(40, 5);

    h.sim.push_event(Event::new(EventKind::CleanerRequest));
    h.step(1); // request delivered, cleaner spawned

    assert_eq!(h.cleaner_count(), 1);
    let cleaner = h
        .sim
        .world()
        .store::<Cleaner>()
        .iter_snapshot()
        .pop()
        .map(|(_, c)| c)
        .unwrap();
    // Row 5 is odd: left to right, launched one trail-length off-screen (it
    // has already moved one tick's worth by the time we look).
    assert!(cleaner.vx > 0.0);
    assert!(cleaner.precise_x < 0.0);
    assert_eq!(h.whoosh_count(), 1);

    // ~640ms in, the cleaner has crossed column 40.
    h.step(40);
    assert!(!h.sim.world().is_alive(red));
    let flashes = h.sim.world().store::<Flash>();
    assert!(
        flashes
            .iter_snapshot()
            .iter()
            .any(|(_, f)| f.x == 40 && f.y == 5),
        "destruction flash spawned at the victim's cell"
    );

    // Past 1.2s of traversal: cleaner gone, finished exactly once.
    h.step(60);
    assert_eq!(h.cleaner_count(), 0);
    assert_eq!(h.finished_count(), 1);
}

// ---------------------------------------------------------------------------
// S2: no-target phantom trigger
// ---------------------------------------------------------------------------

#[test]
fn s2_no_target_request_finishes_without_spawning() {
    let mut h = harness();
    h.sim.push_event(Event::new(EventKind::CleanerRequest));
    h.step(2);

    assert_eq!(h.cleaner_count(), 0);
    assert_eq!(h.whoosh_count(), 0, "no whoosh without a spawn");
    assert_eq!(h.finished_count(), 1);
}

// ---------------------------------------------------------------------------
// S3: directional 4-way
// ---------------------------------------------------------------------------

#[test]
fn s3_directional_four_ways_traverse_and_die() {
    let mut h = harness();
    h.sim.push_event(Event::with_payload(
        EventKind::DirectionalCleanerRequest,
        EventPayload::Origin { x: 20, y: 10 },
    ));
    h.step(1);

    let velocities: Vec<(f64, f64)> = h
        .sim
        .world()
        .store::<Cleaner>()
        .iter_snapshot()
        .into_iter()
        .map(|(_, c)| (c.vx.signum(), c.vy.signum()))
        .collect();
    assert_eq!(velocities.len(), 4);
    for expected in [(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)] {
        assert!(velocities.contains(&expected), "missing direction {expected:?}");
    }

    // Every direction reaches its edge within ~animation duration + margins.
    h.step(100);
    assert_eq!(h.cleaner_count(), 0);
    assert_eq!(h.finished_count(), 1);
}

// ---------------------------------------------------------------------------
// S6: swept anti-tunneling
// ---------------------------------------------------------------------------

#[test]
fn s6_giant_tick_still_hits_target() {
    let mut h = harness();
    let red = h.place_red(41, 5);

    h.sim.push_event(Event::new(EventKind::CleanerRequest));
    h.step(1);

    // One 160ms tick: the cleaner jumps ~12.8 cells. The target inside the
    // jump is still destroyed.
    h.clock.advance(Duration::from_millis(160));
    h.sim.tick();
    h.clock.advance(Duration::from_millis(160));
    h.sim.tick();
    h.clock.advance(Duration::from_millis(160));
    h.sim.tick();
    h.clock.advance(Duration::from_millis(160));
    h.sim.tick();

    assert!(!h.sim.world().is_alive(red));
}

// ---------------------------------------------------------------------------
// Same-frame idempotence
// ---------------------------------------------------------------------------

#[test]
fn duplicate_requests_in_one_frame_spawn_once() {
    let mut h = harness();
    h.place_red(40, 5);
    h.place_red(10, 8);

    // Both events are tagged with the same frame and delivered together.
    h.sim.push_event(Event::new(EventKind::CleanerRequest));
    h.sim.push_event(Event::new(EventKind::CleanerRequest));
    h.step(1);

    assert_eq!(h.cleaner_count(), 2, "one cleaner per red row, not per event");
    assert_eq!(h.whoosh_count(), 1);
}

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

#[test]
fn cleaners_never_touch_out_of_grid_cells() {
    let mut h = harness();
    // Reds at the extreme columns of the top and bottom rows.
    h.place_red(0, 0);
    h.place_red(79, 23);

    h.sim.push_event(Event::new(EventKind::CleanerRequest));
    // Full traversal in small ticks; the swept ranges clamp to the grid, so
    // nothing panics and both targets die.
    h.step(120);

    assert_eq!(h.cleaner_count(), 0);
    assert_eq!(
        h.sim.world().store::<Sequence>().len(),
        0,
        "both edge targets destroyed"
    );
}
