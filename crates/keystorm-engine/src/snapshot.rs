//! Frame-coherent snapshots for the renderer.
//!
//! At the end of every tick the simulation captures an immutable
//! [`FrameSnapshot`] and publishes it through the [`SnapshotPublisher`]. The
//! render thread grabs the latest `Arc` and draws from it without ever
//! touching a store lock mid-frame. The renderer may alternatively read the
//! live stores (they hand out copies), but the snapshot is the frame-coherent
//! path: every view in it was captured inside one tick.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use keystorm_ecs::entity::EntityId;
use keystorm_ecs::spatial::Position;
use keystorm_ecs::world::World;

use crate::components::{
    Boost, Character, Cleaner, Energy, FallingDecay, Flash, GridPoint, Heat, Sequence,
    SequenceColor, SequenceLevel, Shield, StyleId, TrailMarker,
};
use crate::cursor::CursorState;

// ---------------------------------------------------------------------------
// View types
// ---------------------------------------------------------------------------

/// A placed glyph: the renderer's unit of grid content.
#[derive(Debug, Clone)]
pub struct GlyphCell {
    pub entity: EntityId,
    pub x: i32,
    pub y: i32,
    pub glyph: char,
    pub style: StyleId,
    /// Sequence classification, if the glyph is a typed target.
    pub color: Option<SequenceColor>,
    pub level: Option<SequenceLevel>,
}

/// A cleaner projectile with its trail.
#[derive(Debug, Clone)]
pub struct CleanerView {
    pub precise_x: f64,
    pub precise_y: f64,
    pub glyph: char,
    /// Most-recent-first trail cells. Shares the component's slice.
    pub trail: Arc<[GridPoint]>,
}

/// A falling decay drop.
#[derive(Debug, Clone)]
pub struct DropView {
    pub column: i32,
    pub precise_y: f64,
    pub glyph: char,
}

/// A transient flash cell.
#[derive(Debug, Clone)]
pub struct FlashView {
    pub x: i32,
    pub y: i32,
    pub glyph: char,
    /// Remaining fraction of the flash lifetime, in `[0, 1]`.
    pub fade: f64,
}

/// A movement-trail marker.
#[derive(Debug, Clone)]
pub struct TrailMarkerView {
    pub x: i32,
    pub y: i32,
    pub intensity: f32,
}

/// Cursor state as of the captured tick.
#[derive(Debug, Clone, Default)]
pub struct CursorView {
    pub x: i32,
    pub y: i32,
    pub score: i64,
    pub heat: i64,
    pub energy: i64,
    pub shield_active: bool,
    pub boost_active: bool,
    pub boost_color: Option<SequenceColor>,
    pub error_active: bool,
    /// Active score-blink code (0 = error blink), if any.
    pub blink: Option<u8>,
}

// ---------------------------------------------------------------------------
// FrameSnapshot
// ---------------------------------------------------------------------------

/// Immutable, frame-coherent view of the world for one tick.
#[derive(Debug, Clone, Default)]
pub struct FrameSnapshot {
    pub frame: u64,
    pub time: Duration,
    pub paused: bool,
    pub width: i32,
    pub height: i32,
    pub cursor: CursorView,
    pub glyphs: Vec<GlyphCell>,
    pub cleaners: Vec<CleanerView>,
    pub drops: Vec<DropView>,
    pub flashes: Vec<FlashView>,
    pub trail_markers: Vec<TrailMarkerView>,
}

impl FrameSnapshot {
    /// Capture the world into an immutable frame view.
    pub fn capture(world: &World, frame: u64, time: Duration, paused: bool) -> Self {
        let positions = world.store::<Position>();
        let characters = world.store::<Character>();
        let sequences = world.store::<Sequence>();

        let mut glyphs = Vec::with_capacity(characters.len());
        for (entity, character) in characters.iter_snapshot() {
            let Some(pos) = positions.get(entity) else {
                continue;
            };
            let sequence = sequences.get(entity);
            glyphs.push(GlyphCell {
                entity,
                x: pos.x,
                y: pos.y,
                glyph: character.glyph,
                style: character.style,
                color: sequence.map(|s| s.color),
                level: sequence.map(|s| s.level),
            });
        }

        let cleaners = world
            .store::<Cleaner>()
            .iter_snapshot()
            .into_iter()
            .map(|(_, c)| CleanerView {
                precise_x: c.precise_x,
                precise_y: c.precise_y,
                glyph: c.glyph,
                trail: c.trail,
            })
            .collect();

        let drops = world
            .store::<FallingDecay>()
            .iter_snapshot()
            .into_iter()
            .map(|(_, d)| DropView {
                column: d.column,
                precise_y: d.precise_y,
                glyph: d.glyph,
            })
            .collect();

        let flashes = world
            .store::<Flash>()
            .iter_snapshot()
            .into_iter()
            .map(|(_, f)| FlashView {
                x: f.x,
                y: f.y,
                glyph: f.glyph,
                fade: if f.duration > 0.0 {
                    (f.remaining / f.duration).clamp(0.0, 1.0)
                } else {
                    0.0
                },
            })
            .collect();

        let trail_markers = world
            .store::<TrailMarker>()
            .iter_snapshot()
            .into_iter()
            .filter_map(|(entity, marker)| {
                positions.get(entity).map(|pos| TrailMarkerView {
                    x: pos.x,
                    y: pos.y,
                    intensity: marker.intensity,
                })
            })
            .collect();

        let cursor_state = world.resources().must_get::<CursorState>();
        let cursor_entity = cursor_state.entity();
        let (cx, cy) = cursor_state.pos();
        let cursor = CursorView {
            x: cx,
            y: cy,
            score: cursor_state.score(),
            heat: world
                .store::<Heat>()
                .get(cursor_entity)
                .map_or(0, |h| h.load()),
            energy: world
                .store::<Energy>()
                .get(cursor_entity)
                .map_or(0, |e| e.load()),
            shield_active: world
                .store::<Shield>()
                .get(cursor_entity)
                .is_some_and(|s| s.is_active()),
            boost_active: world
                .store::<Boost>()
                .get(cursor_entity)
                .is_some_and(|b| b.is_active()),
            boost_color: world
                .store::<Boost>()
                .get(cursor_entity)
                .and_then(|b| b.color()),
            error_active: cursor_state.error_active(time),
            blink: cursor_state.blink(time),
        };

        Self {
            frame,
            time,
            paused,
            width: world.spatial().width(),
            height: world.spatial().height(),
            cursor,
            glyphs,
            cleaners,
            drops,
            flashes,
            trail_markers,
        }
    }
}

// ---------------------------------------------------------------------------
// SnapshotPublisher
// ---------------------------------------------------------------------------

/// End-of-tick snapshot barrier.
///
/// `publish` swaps in the new frame; `latest` hands the current one to any
/// reader. Readers keep drawing from their `Arc` even while the next frame is
/// being published.
pub struct SnapshotPublisher {
    latest: RwLock<Arc<FrameSnapshot>>,
}

impl SnapshotPublisher {
    /// Create a publisher holding an empty frame 0 snapshot.
    pub fn new() -> Self {
        Self {
            latest: RwLock::new(Arc::new(FrameSnapshot::default())),
        }
    }

    /// Publish a new frame.
    pub fn publish(&self, snapshot: FrameSnapshot) {
        *self.latest.write() = Arc::new(snapshot);
    }

    /// The most recently published frame.
    pub fn latest(&self) -> Arc<FrameSnapshot> {
        Arc::clone(&self.latest.read())
    }
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Heat;
    use crate::config::GameConfig;
    use crate::cursor::spawn_cursor;
    use crate::world_setup::build_world;

    #[test]
    fn capture_collects_placed_glyphs() {
        let world = build_world(&GameConfig::default());
        spawn_cursor(&world, &GameConfig::default());

        let e = world.create_entity();
        world.store::<Character>().insert(
            e,
            Character {
                glyph: 'q',
                style: StyleId(2),
            },
        );
        world.store::<Sequence>().insert(
            e,
            Sequence {
                id: 1,
                index: 0,
                color: SequenceColor::Red,
                level: SequenceLevel::Bright,
            },
        );
        world.spatial().spawn(e, 12, 7);

        let snap = FrameSnapshot::capture(&world, 3, Duration::from_secs(1), false);
        assert_eq!(snap.frame, 3);
        assert_eq!(snap.glyphs.len(), 1);
        let cell = &snap.glyphs[0];
        assert_eq!((cell.x, cell.y, cell.glyph), (12, 7, 'q'));
        assert_eq!(cell.color, Some(SequenceColor::Red));
        assert_eq!(cell.level, Some(SequenceLevel::Bright));
    }

    #[test]
    fn capture_reads_cursor_stats() {
        let config = GameConfig::default();
        let world = build_world(&config);
        let cursor = spawn_cursor(&world, &config);
        world
            .store::<Heat>()
            .get(cursor)
            .unwrap()
            .add_clamped(42, config.max_heat);

        let snap = FrameSnapshot::capture(&world, 1, Duration::ZERO, false);
        assert_eq!(snap.cursor.heat, 42);
        assert!(!snap.cursor.shield_active);
    }

    #[test]
    fn publisher_swaps_frames_atomically() {
        let publisher = SnapshotPublisher::new();
        let before = publisher.latest();
        assert_eq!(before.frame, 0);

        publisher.publish(FrameSnapshot {
            frame: 9,
            ..Default::default()
        });
        // The reader's old Arc is untouched; new readers see frame 9.
        assert_eq!(before.frame, 0);
        assert_eq!(publisher.latest().frame, 9);
    }
}
