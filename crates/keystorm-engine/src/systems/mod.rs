//! Gameplay systems.
//!
//! One module per subsystem. Priorities are fixed constants declared next to
//! each system; lower runs first. The scheduler dispatches events and runs
//! updates strictly in that order: meta, score, shield, gold, cleaner, decay,
//! flash.

pub mod cleaner;
pub mod decay;
pub mod flash;
pub mod gold;
pub mod meta;
pub mod score;
pub mod shield;
