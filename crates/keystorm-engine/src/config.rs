//! Game configuration.
//!
//! [`GameConfig`] is read once at startup (JSON on disk, or defaults) and
//! installed as a resource. All tunables the subsystems consume live here;
//! durations are stored as `f64` seconds to match the tick `dt`.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// A configuration field relationship that fails validation.
#[derive(Debug, thiserror::Error)]
#[error("invalid config: {reason}")]
pub struct ConfigError {
    /// What is wrong.
    pub reason: String,
}

impl ConfigError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// All simulation tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Grid width in cells.
    pub width: i32,
    /// Grid height in cells.
    pub height: i32,
    /// Target simulation rate in ticks per second.
    pub target_fps: u32,

    /// Cleaner trail length in cells (also the off-screen launch offset).
    pub cleaner_trail_length: usize,
    /// Seconds a cleaner takes to traverse the screen.
    pub cleaner_animation_secs: f64,
    /// Frames within which repeated cleaner requests are ignored.
    pub cleaner_dedup_window: u64,

    /// Seconds a destruction flash stays visible.
    pub destruction_flash_secs: f64,

    /// Seconds the gold word stays on the grid.
    pub gold_sequence_secs: f64,
    /// Number of characters in the gold word.
    pub gold_sequence_length: usize,

    /// Seconds between passive shield drains.
    pub shield_drain_interval_secs: f64,
    /// Energy removed per passive shield drain.
    pub shield_drain_amount: i64,

    /// Seconds a boost window is extended per qualifying hit.
    pub boost_extension_secs: f64,
    /// Heat cap; reaching it arms the boost.
    pub max_heat: i64,

    /// Slowest falling-drop speed in rows per second.
    pub falling_min_speed: f64,
    /// Fastest falling-drop speed in rows per second.
    pub falling_max_speed: f64,
    /// Rows below the grid bottom a drop survives (trail tail).
    pub falling_tail_margin: i32,
    /// Decay interval at zero heat, seconds.
    pub decay_interval_max_secs: f64,
    /// Decay interval at max heat, seconds.
    pub decay_interval_min_secs: f64,
    /// Probability a drop mutates its glyph per new row traversed.
    pub glyph_mutation_chance: f64,

    /// Seconds the cursor error flash lasts.
    pub error_blink_secs: f64,
    /// Seconds the score blink lasts.
    pub score_blink_secs: f64,
    /// Seconds a Blue hit extends the trail effect by.
    pub trail_effect_extension_secs: f64,
    /// Seconds a movement-trail marker stays alive.
    pub trail_marker_lifetime_secs: f64,

    /// Characters the spawner and glyph mutation draw from.
    pub alphabet: String,
    /// Seed for the simulation RNG (glyph mutation, gold placement).
    pub rng_seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
            target_fps: 60,

            cleaner_trail_length: 6,
            cleaner_animation_secs: 1.0,
            cleaner_dedup_window: 60,

            destruction_flash_secs: 0.3,

            gold_sequence_secs: 10.0,
            gold_sequence_length: 5,

            shield_drain_interval_secs: 1.0,
            shield_drain_amount: 1,

            boost_extension_secs: 0.5,
            max_heat: 80,

            falling_min_speed: 8.0,
            falling_max_speed: 20.0,
            falling_tail_margin: 4,
            decay_interval_max_secs: 60.0,
            decay_interval_min_secs: 10.0,
            glyph_mutation_chance: 0.4,

            error_blink_secs: 0.15,
            score_blink_secs: 0.25,
            trail_effect_extension_secs: 1.0,
            trail_marker_lifetime_secs: 1.0,

            alphabet: "abcdefghijklmnopqrstuvwxyz0123456789".to_owned(),
            rng_seed: 0x5eed,
        }
    }
}

impl GameConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: GameConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Sanity-check field relationships.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width <= 0 || self.height <= 0 {
            return Err(ConfigError::new(format!(
                "grid dimensions must be positive ({}x{})",
                self.width, self.height
            )));
        }
        if self.target_fps == 0 {
            return Err(ConfigError::new("target_fps must be positive"));
        }
        if self.max_heat <= 0 {
            return Err(ConfigError::new("max_heat must be positive"));
        }
        if self.falling_min_speed <= 0.0 || self.falling_max_speed < self.falling_min_speed {
            return Err(ConfigError::new(format!(
                "falling speed range invalid ({}..{})",
                self.falling_min_speed, self.falling_max_speed
            )));
        }
        if self.decay_interval_min_secs <= 0.0
            || self.decay_interval_max_secs < self.decay_interval_min_secs
        {
            return Err(ConfigError::new(format!(
                "decay interval range invalid ({}..{})",
                self.decay_interval_min_secs, self.decay_interval_max_secs
            )));
        }
        if self.alphabet.is_empty() {
            return Err(ConfigError::new("alphabet must not be empty"));
        }
        if self.gold_sequence_length == 0 {
            return Err(ConfigError::new("gold_sequence_length must be positive"));
        }
        Ok(())
    }

    /// Duration of one simulation frame.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps as f64)
    }

    /// Cleaner speed in cells per second for a horizontal traversal.
    pub fn cleaner_speed_x(&self) -> f64 {
        self.width as f64 / self.cleaner_animation_secs
    }

    /// Cleaner speed in cells per second for a vertical traversal.
    pub fn cleaner_speed_y(&self) -> f64 {
        self.height as f64 / self.cleaner_animation_secs
    }

    /// Decay interval for the given heat, linearly interpolated from
    /// `decay_interval_max_secs` (cold) down to `decay_interval_min_secs`
    /// (max heat).
    pub fn decay_interval(&self, heat: i64) -> Duration {
        let t = (heat as f64 / self.max_heat as f64).clamp(0.0, 1.0);
        let secs = self.decay_interval_max_secs
            + (self.decay_interval_min_secs - self.decay_interval_max_secs) * t;
        Duration::from_secs_f64(secs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
