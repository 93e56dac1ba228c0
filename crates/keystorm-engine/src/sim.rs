//! The simulation driver.
//!
//! [`Simulation`] owns the world, the scheduler, and the clock, and exposes
//! the full external surface: the input layer's typing and event entry
//! points, the renderer's snapshot/pause/grayout reads, and the audio
//! engine's command receiver.
//!
//! One simulation thread drives [`tick`](Simulation::tick) (directly in
//! tests, via [`run`](Simulation::run) in production). `dt` is derived from
//! the clock, so a paused clock yields zero-dt ticks and a mock clock makes
//! every test deterministic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use keystorm_ecs::world::World;

use crate::audio::{audio_channel, AudioCommand, AudioHandle};
use crate::clock::{Clock, PausableClock, TimeResource};
use crate::config::GameConfig;
use crate::cursor::spawn_cursor;
use crate::event::{Event, EventKind, EventQueue};
use crate::schedule::Scheduler;
use crate::snapshot::{FrameSnapshot, SnapshotPublisher};
use crate::status::{StatusRegistry, KEY_GRAYOUT_STARTED_US};
use crate::systems::cleaner::CleanerSystem;
use crate::systems::decay::DecaySystem;
use crate::systems::flash::FlashSystem;
use crate::systems::gold::{spawn_gold_sequence, GoldSystem};
use crate::systems::meta::MetaSystem;
use crate::systems::score::{handle_character_typing, ScoreSystem};
use crate::systems::shield::ShieldSystem;
use crate::world_setup::build_world;

/// Capacity of the audio command channel.
const AUDIO_CHANNEL_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

pub struct Simulation {
    world: Arc<World>,
    scheduler: Scheduler,
    events: Arc<EventQueue>,
    clock: Arc<dyn Clock>,
    /// Present when the simulation owns a real pausable clock.
    pausable: Option<Arc<PausableClock>>,
    snapshots: Arc<SnapshotPublisher>,
    audio_rx: Option<Receiver<AudioCommand>>,
    config: GameConfig,
    last_now: Duration,
}

impl Simulation {
    /// Build a simulation on a real pausable clock.
    pub fn new(config: GameConfig) -> anyhow::Result<Self> {
        let pausable = Arc::new(PausableClock::new());
        Self::build(config, pausable.clone(), Some(pausable))
    }

    /// Build a simulation on a caller-provided clock (tests use a mock).
    pub fn with_clock(config: GameConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        Self::build(config, clock, None)
    }

    fn build(
        config: GameConfig,
        clock: Arc<dyn Clock>,
        pausable: Option<Arc<PausableClock>>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let world = Arc::new(build_world(&config));
        world.resources().insert(TimeResource(Arc::clone(&clock)));

        let status = world.resources().must_get::<StatusRegistry>();
        let (audio, audio_rx) = audio_channel(AUDIO_CHANNEL_CAPACITY, status);
        world.resources().insert(audio);

        let mut scheduler = Scheduler::new();
        scheduler.register(Box::new(MetaSystem::new()));
        scheduler.register(Box::new(ScoreSystem::new()));
        scheduler.register(Box::new(ShieldSystem::new()));
        scheduler.register(Box::new(GoldSystem::new()));
        scheduler.register(Box::new(CleanerSystem::new()));
        scheduler.register(Box::new(DecaySystem::new(config.rng_seed)));
        scheduler.register(Box::new(FlashSystem::new()));

        spawn_cursor(&world, &config);

        let events = scheduler.queue();
        let last_now = clock.now();
        tracing::info!(
            width = config.width,
            height = config.height,
            systems = ?scheduler.system_names(),
            "simulation built"
        );
        Ok(Self {
            world,
            scheduler,
            events,
            clock,
            pausable,
            snapshots: Arc::new(SnapshotPublisher::new()),
            audio_rx: Some(audio_rx),
            config,
            last_now,
        })
    }

    /// Register an additional system (diagnostics, external integrations).
    ///
    /// # Panics
    ///
    /// Panics on a duplicate system name.
    pub fn register_system(&mut self, system: Box<dyn crate::schedule::System>) {
        self.scheduler.register(system);
    }

    // -- tick loop -----------------------------------------------------------

    /// Execute one tick: derive `dt` from the clock (zero while paused), run
    /// the scheduler, publish the frame snapshot.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        let dt = now.saturating_sub(self.last_now).as_secs_f64();
        self.last_now = now;

        self.scheduler.tick(&self.world, dt);

        let snapshot =
            FrameSnapshot::capture(&self.world, self.scheduler.frame(), now, self.is_paused());
        self.snapshots.publish(snapshot);
    }

    /// Drive the tick loop at the configured rate until `shutdown` is set,
    /// then offer every system its shutdown hook.
    pub fn run(&mut self, shutdown: Arc<AtomicBool>) {
        let interval = self.config.frame_interval();
        while !shutdown.load(Ordering::SeqCst) {
            let started = Instant::now();
            self.tick();
            let cost = started.elapsed();
            if cost < interval {
                std::thread::sleep(interval - cost);
            }
        }
        self.scheduler.shutdown_all(&self.world);
        tracing::info!("simulation stopped");
    }

    // -- input surface -------------------------------------------------------

    /// Process one typed rune at a grid cell.
    pub fn handle_character_typing(&self, x: i32, y: i32, typed: char) {
        handle_character_typing(&self.world, &self.events, x, y, typed);
    }

    /// Queue an event for the next tick.
    pub fn push_event(&self, event: Event) {
        self.events.push(event);
    }

    /// Reset the world synchronously (immediate dispatch; see the meta
    /// system for the choreography).
    pub fn request_reset(&mut self) {
        self.scheduler
            .dispatch_immediate(&self.world, Event::new(EventKind::GameReset));
    }

    /// Spawn a gold word now (spawner FSM surface).
    pub fn spawn_gold(&self) -> bool {
        spawn_gold_sequence(&self.world, &self.events)
    }

    // -- renderer surface ----------------------------------------------------

    /// The snapshot publisher for the render thread.
    pub fn snapshots(&self) -> Arc<SnapshotPublisher> {
        Arc::clone(&self.snapshots)
    }

    /// Current frame number.
    pub fn frame(&self) -> u64 {
        self.scheduler.frame()
    }

    pub fn is_paused(&self) -> bool {
        self.pausable.as_ref().is_some_and(|c| c.is_paused())
    }

    pub fn pause(&self) {
        if let Some(clock) = &self.pausable {
            clock.pause();
        }
    }

    pub fn resume(&self) {
        if let Some(clock) = &self.pausable {
            clock.resume();
        }
    }

    /// Grayscale fade intensity in `[0, 1]` for the post-processing pass.
    ///
    /// Zero until a grayout is started (the `render.grayout_started_us`
    /// status counter), then ramps linearly over `duration`.
    pub fn grayout_intensity(&self, now: Duration, duration: Duration) -> f64 {
        let status = self.world.resources().must_get::<StatusRegistry>();
        let started_us = status.counter(KEY_GRAYOUT_STARTED_US);
        if started_us <= 0 || duration.is_zero() {
            return 0.0;
        }
        let started = Duration::from_micros(started_us as u64);
        let elapsed = now.saturating_sub(started);
        (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    // -- plumbing ------------------------------------------------------------

    /// The ECS world.
    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    /// Game time now.
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Take the audio command receiver (once; the audio engine owns it).
    pub fn take_audio_receiver(&mut self) -> Option<Receiver<AudioCommand>> {
        self.audio_rx.take()
    }

    /// The simulation-side audio handle.
    pub fn audio(&self) -> AudioHandle {
        (*self.world.resources().must_get::<AudioHandle>()).clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
