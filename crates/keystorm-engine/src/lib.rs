//! Keystorm Engine -- fixed-tick simulation core for a terminal typing game.
//!
//! This crate builds on [`keystorm_ecs`] to provide the full simulation: a
//! pausable/mockable clock, frame-tagged events with a priority-ordered
//! scheduler, the gameplay systems (cleaners, decay drops, scoring and heat,
//! shield, flashes, gold words, reset), and a frame-coherent snapshot layer
//! for the render thread.
//!
//! # Quick Start
//!
//! ```
//! use keystorm_engine::prelude::*;
//! use std::sync::Arc;
//!
//! let clock = Arc::new(MockClock::new());
//! let mut sim = Simulation::with_clock(GameConfig::default(), clock.clone()).unwrap();
//!
//! clock.advance(std::time::Duration::from_millis(16));
//! sim.tick();
//!
//! assert_eq!(sim.frame(), 1);
//! assert_eq!(sim.snapshots().latest().frame, 1);
//! ```

#![deny(unsafe_code)]

pub mod audio;
pub mod clock;
pub mod components;
pub mod config;
pub mod cursor;
pub mod event;
pub mod schedule;
pub mod sim;
pub mod snapshot;
pub mod status;
pub mod systems;
pub mod world_setup;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use keystorm_ecs;

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Install the global tracing subscriber, filtered by `RUST_LOG`.
///
/// Call once from the binary; repeated calls are ignored.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use keystorm_ecs::prelude::*;

    pub use crate::audio::{AudioCommand, AudioHandle, AudioKind};
    pub use crate::clock::{Clock, MockClock, PausableClock, TimeResource};
    pub use crate::components::{
        Boost, Character, Cleaner, Drain, Energy, FallingDecay, Flash, GridPoint, Heat, Nugget,
        Sequence, SequenceColor, SequenceLevel, Shield, StyleId, TrailMarker,
    };
    pub use crate::config::GameConfig;
    pub use crate::cursor::CursorState;
    pub use crate::event::{Event, EventKind, EventPayload, EventQueue};
    pub use crate::schedule::{Scheduler, System};
    pub use crate::sim::Simulation;
    pub use crate::snapshot::{FrameSnapshot, SnapshotPublisher};
    pub use crate::status::StatusRegistry;
    pub use crate::world_setup::{build_world, SequenceIdGen};
}
