//! Simulation time.
//!
//! All simulation time reads go through the [`Clock`] capability so tests can
//! drive the world with a [`MockClock`]. Game time is a [`Duration`] since
//! session start; the [`PausableClock`] stops advancing while paused.
//!
//! Timers in the simulation poll `now >= deadline` each tick instead of using
//! callback timers: no cross-thread timer fires, and everything is
//! deterministic under the mock clock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Monotonic game-time source. Safe for concurrent reads.
pub trait Clock: Send + Sync {
    /// Game time elapsed since session start.
    fn now(&self) -> Duration;
}

/// The time resource installed in the world's resource registry.
#[derive(Clone)]
pub struct TimeResource(pub Arc<dyn Clock>);

impl TimeResource {
    /// Game time elapsed since session start.
    pub fn now(&self) -> Duration {
        self.0.now()
    }
}

// ---------------------------------------------------------------------------
// PausableClock
// ---------------------------------------------------------------------------

/// Wall-clock-backed game time that freezes while paused.
pub struct PausableClock {
    start: Instant,
    paused: AtomicBool,
    /// Total microseconds spent paused so far (excluding a live pause).
    paused_total_us: AtomicU64,
    /// Wall microseconds since `start` at which the live pause began.
    pause_began_us: AtomicU64,
}

impl PausableClock {
    /// Create a running clock starting at zero game time.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            paused: AtomicBool::new(false),
            paused_total_us: AtomicU64::new(0),
            pause_began_us: AtomicU64::new(0),
        }
    }

    #[inline]
    fn wall_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Freeze game time. Idempotent.
    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            self.pause_began_us.store(self.wall_us(), Ordering::SeqCst);
        }
    }

    /// Resume game time. Idempotent.
    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            let began = self.pause_began_us.load(Ordering::SeqCst);
            let paused_for = self.wall_us().saturating_sub(began);
            self.paused_total_us.fetch_add(paused_for, Ordering::SeqCst);
        }
    }

    /// Whether game time is currently frozen.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

impl Clock for PausableClock {
    fn now(&self) -> Duration {
        let paused_total = self.paused_total_us.load(Ordering::SeqCst);
        let effective = if self.paused.load(Ordering::SeqCst) {
            self.pause_began_us.load(Ordering::SeqCst)
        } else {
            self.wall_us()
        };
        Duration::from_micros(effective.saturating_sub(paused_total))
    }
}

impl Default for PausableClock {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// MockClock
// ---------------------------------------------------------------------------

/// Manually advanced clock for deterministic tests.
pub struct MockClock {
    now_us: AtomicU64,
}

impl MockClock {
    /// Create a mock clock at zero game time.
    pub fn new() -> Self {
        Self {
            now_us: AtomicU64::new(0),
        }
    }

    /// Advance game time by `dt`.
    pub fn advance(&self, dt: Duration) {
        self.now_us
            .fetch_add(dt.as_micros() as u64, Ordering::SeqCst);
    }

    /// Set game time to an absolute value.
    pub fn set(&self, now: Duration) {
        self.now_us.store(now.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.now_us.load(Ordering::SeqCst))
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
