//! Status registry: cross-thread atomic cells.
//!
//! The registry replaces ad-hoc globals with a string-keyed collection of
//! atomic flags, counters, and gauges. It is the only state both the
//! simulation thread and reader threads may write (dropped-audio counters,
//! payload-mismatch counters, pause markers); everything else is
//! single-writer.
//!
//! Cells are created on first use and never removed, so handles returned by
//! the registry stay valid for the session.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// StatusRegistry
// ---------------------------------------------------------------------------

/// String-keyed atomic bools, counters, and gauges.
pub struct StatusRegistry {
    flags: RwLock<HashMap<String, Arc<AtomicBool>>>,
    counters: RwLock<HashMap<String, Arc<AtomicI64>>>,
    /// f64 gauges, bit-cast into the atomic.
    gauges: RwLock<HashMap<String, Arc<AtomicU64>>>,
}

impl StatusRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            flags: RwLock::new(HashMap::new()),
            counters: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
        }
    }

    fn flag_cell(&self, key: &str) -> Arc<AtomicBool> {
        if let Some(cell) = self.flags.read().get(key) {
            return Arc::clone(cell);
        }
        let mut flags = self.flags.write();
        Arc::clone(
            flags
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(AtomicBool::new(false))),
        )
    }

    fn counter_cell(&self, key: &str) -> Arc<AtomicI64> {
        if let Some(cell) = self.counters.read().get(key) {
            return Arc::clone(cell);
        }
        let mut counters = self.counters.write();
        Arc::clone(
            counters
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(AtomicI64::new(0))),
        )
    }

    fn gauge_cell(&self, key: &str) -> Arc<AtomicU64> {
        if let Some(cell) = self.gauges.read().get(key) {
            return Arc::clone(cell);
        }
        let mut gauges = self.gauges.write();
        Arc::clone(
            gauges
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(AtomicU64::new(0f64.to_bits()))),
        )
    }

    // -- flags ---------------------------------------------------------------

    /// Set a boolean flag.
    pub fn set_flag(&self, key: &str, value: bool) {
        self.flag_cell(key).store(value, Ordering::SeqCst);
    }

    /// Read a boolean flag (false if never set).
    pub fn flag(&self, key: &str) -> bool {
        self.flag_cell(key).load(Ordering::SeqCst)
    }

    // -- counters ------------------------------------------------------------

    /// Add `delta` to a counter and return the new value.
    pub fn incr(&self, key: &str, delta: i64) -> i64 {
        self.counter_cell(key).fetch_add(delta, Ordering::SeqCst) + delta
    }

    /// Set a counter to an absolute value.
    pub fn set_counter(&self, key: &str, value: i64) {
        self.counter_cell(key).store(value, Ordering::SeqCst);
    }

    /// Read a counter (0 if never set).
    pub fn counter(&self, key: &str) -> i64 {
        self.counter_cell(key).load(Ordering::SeqCst)
    }

    // -- gauges --------------------------------------------------------------

    /// Set a float gauge.
    pub fn set_gauge(&self, key: &str, value: f64) {
        self.gauge_cell(key).store(value.to_bits(), Ordering::SeqCst);
    }

    /// Read a float gauge (0.0 if never set).
    pub fn gauge(&self, key: &str) -> f64 {
        f64::from_bits(self.gauge_cell(key).load(Ordering::SeqCst))
    }

    // -- overlay -------------------------------------------------------------

    /// Sorted `key -> rendered value` view of every cell, for the debug
    /// overlay.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (key, cell) in self.flags.read().iter() {
            out.insert(key.clone(), cell.load(Ordering::SeqCst).to_string());
        }
        for (key, cell) in self.counters.read().iter() {
            out.insert(key.clone(), cell.load(Ordering::SeqCst).to_string());
        }
        for (key, cell) in self.gauges.read().iter() {
            let value = f64::from_bits(cell.load(Ordering::SeqCst));
            out.insert(key.clone(), format!("{value:.3}"));
        }
        out
    }
}

impl Default for StatusRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Well-known keys
// ---------------------------------------------------------------------------

/// Audio commands dropped because the channel was full.
pub const KEY_AUDIO_DROPPED: &str = "audio.dropped";
/// Events dropped because a subscriber saw the wrong payload shape.
pub const KEY_PAYLOAD_MISMATCH: &str = "events.payload_mismatch";
/// Total cleaners spawned this session.
pub const KEY_CLEANERS_SPAWNED: &str = "cleaner.spawned";
/// Total decay waves triggered this session.
pub const KEY_DECAY_WAVES: &str = "decay.waves";
/// Total gold sequences spawned this session.
pub const KEY_GOLD_SPAWNED: &str = "gold.spawned";
/// Game time (microseconds) at which the grayscale fade started; 0 = none.
pub const KEY_GRAYOUT_STARTED_US: &str = "render.grayout_started_us";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
