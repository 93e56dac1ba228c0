//! Game component types.
//!
//! Plain-data components derive serde for config/snapshot tooling. The
//! cursor-bound counters (Heat, Energy, Shield, Boost) instead wrap shared
//! atomic cells: cloning the component clones the `Arc`, so a value copied
//! out of a store remains a live view of the same cell. That is what lets the
//! render thread read heat and energy without taking any store lock.
//!
//! `Cleaner.trail` is an `Arc<[GridPoint]>` replaced wholesale on every trail
//! change -- readers holding a clone see either the old or the new slice,
//! never a partially written one.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use keystorm_ecs::entity::EntityId;

// ---------------------------------------------------------------------------
// Sequence classification
// ---------------------------------------------------------------------------

/// Target color class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequenceColor {
    Green,
    Blue,
    Red,
    Gold,
}

impl SequenceColor {
    /// Score-blink code for this color. Code 0 is reserved for errors.
    pub fn blink_code(self) -> u8 {
        match self {
            SequenceColor::Blue => 1,
            SequenceColor::Green => 2,
            SequenceColor::Red => 3,
            SequenceColor::Gold => 4,
        }
    }

    /// Inverse of [`blink_code`](Self::blink_code); 0 and unknown codes are
    /// `None`.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(SequenceColor::Blue),
            2 => Some(SequenceColor::Green),
            3 => Some(SequenceColor::Red),
            4 => Some(SequenceColor::Gold),
            _ => None,
        }
    }
}

/// Decay level of a target. Demotion only moves downward; a Dark target that
/// decays again is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SequenceLevel {
    Dark,
    Normal,
    Bright,
}

impl SequenceLevel {
    /// One level down, or `None` when already Dark.
    pub fn demote(self) -> Option<SequenceLevel> {
        match self {
            SequenceLevel::Bright => Some(SequenceLevel::Normal),
            SequenceLevel::Normal => Some(SequenceLevel::Dark),
            SequenceLevel::Dark => None,
        }
    }

    /// Scoring multiplier: Dark 1, Normal 2, Bright 3.
    pub fn multiplier(self) -> i64 {
        match self {
            SequenceLevel::Dark => 1,
            SequenceLevel::Normal => 2,
            SequenceLevel::Bright => 3,
        }
    }
}

/// Target classification: which word it belongs to, where in the word, and
/// its color/level class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    /// Word identifier, from the sequence id generator.
    pub id: u64,
    /// Index of this glyph within its word.
    pub index: usize,
    /// Color class.
    pub color: SequenceColor,
    /// Decay level.
    pub level: SequenceLevel,
}

// ---------------------------------------------------------------------------
// Display glyphs
// ---------------------------------------------------------------------------

/// Opaque handle into the renderer's style table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StyleId(pub u16);

/// The displayable glyph of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Typed-against codepoint.
    pub glyph: char,
    /// Render style handle.
    pub style: StyleId,
}

// ---------------------------------------------------------------------------
// Cleaner
// ---------------------------------------------------------------------------

/// An integer grid cell, used for cleaner trails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

/// A projectile sweeping the grid, destroying Red targets in its path.
#[derive(Debug, Clone)]
pub struct Cleaner {
    /// Sub-cell position.
    pub precise_x: f64,
    pub precise_y: f64,
    /// Velocity in cells per second.
    pub vx: f64,
    pub vy: f64,
    /// Destination on the motion axis; crossing it destroys the cleaner.
    pub target_x: f64,
    pub target_y: f64,
    /// `floor(precise)` after the last physics step.
    pub grid_x: i32,
    pub grid_y: i32,
    /// Most-recent-first trail of occupied cells. Replaced wholesale on every
    /// change; never mutated in place.
    pub trail: Arc<[GridPoint]>,
    /// Projectile glyph.
    pub glyph: char,
}

impl Cleaner {
    /// Push a new head cell onto the trail, copy-on-write.
    ///
    /// Allocates a fresh slice of length `min(len + 1, max_len)` with `head`
    /// at index 0 and up to `max_len - 1` old entries behind it, then swaps
    /// the field. The old slice is untouched, so concurrent readers holding a
    /// clone keep a coherent view.
    pub fn push_trail(&mut self, head: GridPoint, max_len: usize) {
        if max_len == 0 {
            self.trail = Arc::from(&[][..]);
            return;
        }
        let keep = self.trail.len().min(max_len - 1);
        let mut fresh = Vec::with_capacity(keep + 1);
        fresh.push(head);
        fresh.extend_from_slice(&self.trail[..keep]);
        self.trail = Arc::from(fresh.into_boxed_slice());
    }
}

// ---------------------------------------------------------------------------
// FallingDecay
// ---------------------------------------------------------------------------

/// A raindrop entity sweeping down one column, demoting targets it crosses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallingDecay {
    /// Column being swept.
    pub column: i32,
    /// Sub-cell vertical position.
    pub precise_y: f64,
    /// Fall speed in rows per second.
    pub speed: f64,
    /// Current raindrop glyph (mutates while falling).
    pub glyph: char,
    /// Last row at which the glyph mutated.
    pub last_change_row: i32,
    /// Coordinate latch: last cell whose hit this drop consumed. A row once
    /// latched is never re-hit by the same drop.
    pub last_int_x: i32,
    pub last_int_y: i32,
    /// Position before the last physics step (swept-hit lower bound).
    pub prev_precise_x: f64,
    pub prev_precise_y: f64,
}

// ---------------------------------------------------------------------------
// Flash
// ---------------------------------------------------------------------------

/// A transient VFX cell counting down to self-destruction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Flash {
    pub x: i32,
    pub y: i32,
    pub glyph: char,
    /// Seconds left to live.
    pub remaining: f64,
    /// Original lifetime, for fade curves renderer-side.
    pub duration: f64,
}

// ---------------------------------------------------------------------------
// Cursor-bound atomic components
// ---------------------------------------------------------------------------

/// Typing-streak meter. The cell is shared across clones.
#[derive(Debug, Clone)]
pub struct Heat {
    cell: Arc<AtomicI64>,
}

impl Heat {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn load(&self) -> i64 {
        self.cell.load(Ordering::SeqCst)
    }

    /// Store `value` clamped to `[0, max]`.
    pub fn store_clamped(&self, value: i64, max: i64) {
        self.cell.store(value.clamp(0, max), Ordering::SeqCst);
    }

    /// Add `delta`, clamped to `[0, max]`; returns the new value.
    pub fn add_clamped(&self, delta: i64, max: i64) -> i64 {
        let mut current = self.cell.load(Ordering::SeqCst);
        loop {
            let next = (current + delta).clamp(0, max);
            match self.cell.compare_exchange_weak(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return next,
                Err(observed) => current = observed,
            }
        }
    }

    pub fn reset(&self) {
        self.cell.store(0, Ordering::SeqCst);
    }
}

impl Default for Heat {
    fn default() -> Self {
        Self::new()
    }
}

/// Cursor energy. Never negative.
#[derive(Debug, Clone)]
pub struct Energy {
    cell: Arc<AtomicI64>,
}

impl Energy {
    pub fn new(initial: i64) -> Self {
        Self {
            cell: Arc::new(AtomicI64::new(initial.max(0))),
        }
    }

    pub fn load(&self) -> i64 {
        self.cell.load(Ordering::SeqCst)
    }

    pub fn store(&self, value: i64) {
        self.cell.store(value.max(0), Ordering::SeqCst);
    }

    /// Add `delta` (negative drains), floored at 0; returns the new value.
    pub fn add(&self, delta: i64) -> i64 {
        let mut current = self.cell.load(Ordering::SeqCst);
        loop {
            let next = (current + delta).max(0);
            match self.cell.compare_exchange_weak(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return next,
                Err(observed) => current = observed,
            }
        }
    }
}

/// Cursor shield: active flag plus the last passive-drain timestamp.
#[derive(Debug, Clone)]
pub struct Shield {
    active: Arc<AtomicBool>,
    last_drain_us: Arc<AtomicU64>,
}

impl Shield {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
            last_drain_us: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    pub fn last_drain(&self) -> Duration {
        Duration::from_micros(self.last_drain_us.load(Ordering::SeqCst))
    }

    pub fn set_last_drain(&self, at: Duration) {
        self.last_drain_us
            .store(at.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Default for Shield {
    fn default() -> Self {
        Self::new()
    }
}

/// Boost window: armed at max heat, color-locked, deadline-polled.
#[derive(Debug, Clone)]
pub struct Boost {
    active: Arc<AtomicBool>,
    /// Blink-code encoding of the boost color; 0 = none.
    color_code: Arc<AtomicU8>,
    end_us: Arc<AtomicU64>,
}

impl Boost {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
            color_code: Arc::new(AtomicU8::new(0)),
            end_us: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn color(&self) -> Option<SequenceColor> {
        SequenceColor::from_code(self.color_code.load(Ordering::SeqCst))
    }

    /// Record a color without (re)arming the window.
    pub fn set_color(&self, color: Option<SequenceColor>) {
        self.color_code.store(
            color.map(SequenceColor::blink_code).unwrap_or(0),
            Ordering::SeqCst,
        );
    }

    pub fn end(&self) -> Duration {
        Duration::from_micros(self.end_us.load(Ordering::SeqCst))
    }

    /// Arm the boost for `color` until `end`.
    pub fn arm(&self, color: SequenceColor, end: Duration) {
        self.color_code
            .store(color.blink_code(), Ordering::SeqCst);
        self.end_us.store(end.as_micros() as u64, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);
    }

    /// Push the deadline out to `end` (same-color extension).
    pub fn extend_to(&self, end: Duration) {
        self.end_us
            .fetch_max(end.as_micros() as u64, Ordering::SeqCst);
    }

    /// Clear the window and the color lock.
    pub fn clear(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.color_code.store(0, Ordering::SeqCst);
    }

    /// Atomic expiry poll: if active and `now` is past the deadline, clear
    /// and return `true`.
    pub fn expire_if_past(&self, now: Duration) -> bool {
        if !self.active.load(Ordering::SeqCst) {
            return false;
        }
        if now.as_micros() as u64 > self.end_us.load(Ordering::SeqCst) {
            self.clear();
            return true;
        }
        false
    }
}

impl Default for Boost {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Misc components
// ---------------------------------------------------------------------------

/// An effect draining another entity; the target is resolved lazily via the
/// store, never held as a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drain {
    pub target: EntityId,
}

/// Marks one glyph of the active gold word with its position in the word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nugget {
    pub order: usize,
}

/// A fading movement-trail marker left behind the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailMarker {
    /// Render intensity in `(0, 1]`.
    pub intensity: f32,
    /// Game time at which the marker was dropped.
    pub timestamp: Duration,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
