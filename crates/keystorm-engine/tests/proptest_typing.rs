//! Property tests over the typing state machine.
//!
//! Random sequences of hits, misses, and boost-window expiries are thrown at
//! a full simulation; after every step the machine's invariants must hold:
//! heat stays in `[0, max_heat]`, heat is zero right after a Red hit or a
//! miss, and the boost is never active past its deadline.

use std::sync::Arc;
use std::time::Duration;

use keystorm_engine::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum TypingOp {
    Hit(u8, u8),
    Miss,
    Wait(u16),
}

fn op_strategy() -> impl Strategy<Value = TypingOp> {
    prop_oneof![
        6 => (0..4u8, 0..3u8).prop_map(|(color, level)| TypingOp::Hit(color, level)),
        2 => Just(TypingOp::Miss),
        2 => (1..700u16).prop_map(TypingOp::Wait),
    ]
}

fn color_of(code: u8) -> SequenceColor {
    match code {
        0 => SequenceColor::Green,
        1 => SequenceColor::Blue,
        2 => SequenceColor::Red,
        _ => SequenceColor::Gold,
    }
}

fn level_of(code: u8) -> SequenceLevel {
    match code {
        0 => SequenceLevel::Dark,
        1 => SequenceLevel::Normal,
        _ => SequenceLevel::Bright,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn typing_machine_invariants(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let clock = Arc::new(MockClock::new());
        let mut sim = Simulation::with_clock(GameConfig::default(), clock.clone()).unwrap();
        let config = GameConfig::default();

        let world = Arc::clone(sim.world());
        let cursor_entity = world.resources().must_get::<CursorState>().entity();
        let heat = world.store::<Heat>().get(cursor_entity).unwrap();
        let boost = world.store::<Boost>().get(cursor_entity).unwrap();

        let cell = (40, 12);
        for op in ops {
            match op {
                TypingOp::Hit(color_code, level_code) => {
                    let color = color_of(color_code);
                    // Gold needs a live gold window; type it as a plain
                    // sequence instead, which is what stray gold glyphs are.
                    if color == SequenceColor::Gold {
                        continue;
                    }
                    let e = world.create_entity();
                    world.store::<Character>().insert(e, Character {
                        glyph: 'k',
                        style: StyleId(0),
                    });
                    world.store::<Sequence>().insert(e, Sequence {
                        id: 1,
                        index: 0,
                        color,
                        level: level_of(level_code),
                    });
                    world.spatial().spawn(e, cell.0, cell.1);

                    sim.handle_character_typing(cell.0, cell.1, 'k');
                    prop_assert!(!world.is_alive(e), "hit target must be destroyed");

                    if color == SequenceColor::Red {
                        prop_assert_eq!(heat.load(), 0, "red hit zeroes heat");
                        prop_assert!(!boost.is_active(), "red hit clears boost");
                    }
                }
                TypingOp::Miss => {
                    sim.handle_character_typing(cell.0, cell.1, 'z');
                    prop_assert_eq!(heat.load(), 0, "miss zeroes heat");
                    prop_assert!(!boost.is_active(), "miss clears boost");
                }
                TypingOp::Wait(ms) => {
                    clock.advance(Duration::from_millis(ms as u64));
                    sim.tick();
                }
            }

            // Global invariants, every step.
            let h = heat.load();
            prop_assert!((0..=config.max_heat).contains(&h), "heat {} out of range", h);
            if boost.is_active() {
                prop_assert!(
                    clock.now() <= boost.end() + Duration::from_millis(1),
                    "active boost past deadline before the expiry tick"
                );
            }
        }

        // One final tick settles any pending expiry.
        clock.advance(Duration::from_millis(16));
        sim.tick();
        if clock.now() > boost.end() {
            prop_assert!(!boost.is_active(), "boost must expire after its window");
        }
    }
}
