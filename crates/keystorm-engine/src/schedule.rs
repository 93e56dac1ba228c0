//! Priority-ordered system scheduler.
//!
//! Each tick:
//!
//! 1. The frame number increments and becomes the tag for new events.
//! 2. The event queue is drained; each drained event is dispatched, in
//!    ascending system priority, to every system whose
//!    [`event_kinds`](System::event_kinds) contains the kind.
//! 3. Every system's [`update`](System::update) runs in ascending priority.
//!
//! Events pushed during steps 2 or 3 stay queued until the next tick. The one
//! exception is the reset choreography, which goes through
//! [`dispatch_immediate`](Scheduler::dispatch_immediate) so that the world is
//! cleared before any system observes a frame with mixed state.

use std::sync::Arc;

use keystorm_ecs::world::World;

use crate::event::{Event, EventKind, EventQueue};

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// A simulation system.
///
/// Systems are registered once; registration order is irrelevant except as a
/// tie-break between equal priorities. Lower priority runs first. `update`
/// must not block and must not spawn threads that touch the world.
pub trait System: Send {
    /// Unique system name, for registration checks and logging.
    fn name(&self) -> &'static str;

    /// Execution priority; lower runs first.
    fn priority(&self) -> i32;

    /// Event kinds this system subscribes to.
    fn event_kinds(&self) -> &[EventKind] {
        &[]
    }

    /// Handle one subscribed event. New events go to `events` and are
    /// delivered next tick.
    fn handle_event(&mut self, _world: &World, _events: &EventQueue, _event: &Event) {}

    /// Per-tick update with `dt` in seconds of game time.
    fn update(&mut self, world: &World, events: &EventQueue, dt: f64);

    /// Offered once on simulation shutdown. Stores are not drained.
    fn shutdown(&mut self, _world: &World) {}
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Ordered system list plus the event queue and frame counter.
pub struct Scheduler {
    /// Systems sorted by ascending priority (stable on registration order).
    systems: Vec<Box<dyn System>>,
    queue: Arc<EventQueue>,
    frame: u64,
}

impl Scheduler {
    /// Create an empty scheduler at frame 0.
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            queue: Arc::new(EventQueue::new()),
            frame: 0,
        }
    }

    /// The shared event queue.
    pub fn queue(&self) -> Arc<EventQueue> {
        Arc::clone(&self.queue)
    }

    /// Register a system.
    ///
    /// # Panics
    ///
    /// Panics if a system with the same name is already registered.
    pub fn register(&mut self, system: Box<dyn System>) {
        assert!(
            !self.systems.iter().any(|s| s.name() == system.name()),
            "duplicate system name: {:?}",
            system.name()
        );
        tracing::debug!(
            system = system.name(),
            priority = system.priority(),
            "registered system"
        );
        self.systems.push(system);
        self.systems.sort_by_key(|s| s.priority());
    }

    /// The current frame number.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Names of all registered systems in execution order.
    pub fn system_names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    /// Execute one tick: advance the frame, deliver queued events, update all
    /// systems. `dt` is in seconds of game time (0 while paused).
    pub fn tick(&mut self, world: &World, dt: f64) {
        self.frame += 1;
        self.queue.set_frame(self.frame);

        let drained = self.queue.drain();
        for event in &drained {
            self.fan_out(world, event);
        }

        for system in &mut self.systems {
            system.update(world, &self.queue, dt);
        }
    }

    /// Dispatch one event synchronously, bypassing the queue.
    ///
    /// Used only by the reset choreography; everything else goes through the
    /// queue to keep the within-tick ordering guarantees simple.
    pub fn dispatch_immediate(&mut self, world: &World, mut event: Event) {
        event.frame = self.frame;
        self.fan_out(world, &event);
    }

    /// Offer every system its shutdown hook, in execution order.
    pub fn shutdown_all(&mut self, world: &World) {
        for system in &mut self.systems {
            system.shutdown(world);
        }
    }

    fn fan_out(&mut self, world: &World, event: &Event) {
        for system in &mut self.systems {
            if system.event_kinds().contains(&event.kind) {
                system.handle_event(world, &self.queue, event);
            }
        }
    }
}

impl Default for Scheduler {
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
    use crate::event::EventPayload;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn world() -> World {
        World::new(80, 24)
    }

    /// Records the order in which update was called across systems.
    struct OrderProbe {
        name: &'static str,
        priority: i32,
        counter: Arc<AtomicU64>,
        seen_at: Arc<AtomicU64>,
    }

    impl System for OrderProbe {
        fn name(&self) -> &'static str {
            self.name
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        fn update(&mut self, _world: &World, _events: &EventQueue, _dt: f64) {
            self.seen_at
                .store(self.counter.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
        }
    }

    #[test]
    fn systems_run_in_ascending_priority() {
        let counter = Arc::new(AtomicU64::new(0));
        let first = Arc::new(AtomicU64::new(u64::MAX));
        let second = Arc::new(AtomicU64::new(u64::MAX));

        let mut scheduler = Scheduler::new();
        // Registered out of order on purpose.
        scheduler.register(Box::new(OrderProbe {
            name: "late",
            priority: 50,
            counter: counter.clone(),
            seen_at: second.clone(),
        }));
        scheduler.register(Box::new(OrderProbe {
            name: "early",
            priority: 10,
            counter: counter.clone(),
            seen_at: first.clone(),
        }));

        assert_eq!(scheduler.system_names(), vec!["early", "late"]);
        scheduler.tick(&world(), 0.016);
        assert!(first.load(Ordering::SeqCst) < second.load(Ordering::SeqCst));
    }

    #[test]
    #[should_panic(expected = "duplicate system name")]
    fn duplicate_name_panics() {
        let counter = Arc::new(AtomicU64::new(0));
        let mut scheduler = Scheduler::new();
        for _ in 0..2 {
            scheduler.register(Box::new(OrderProbe {
                name: "dup",
                priority: 0,
                counter: counter.clone(),
                seen_at: Arc::new(AtomicU64::new(0)),
            }));
        }
    }

    /// Counts received events, optionally re-pushing one.
    struct EventSink {
        received: Arc<AtomicU64>,
        repush: bool,
    }

    impl System for EventSink {
        fn name(&self) -> &'static str {
            "sink"
        }
        fn priority(&self) -> i32 {
            0
        }
        fn event_kinds(&self) -> &[EventKind] {
            &[EventKind::FlashRequest]
        }
        fn handle_event(&mut self, _world: &World, events: &EventQueue, event: &Event) {
            assert_eq!(event.payload.flash(), Some((1, 2, '*')));
            self.received.fetch_add(1, Ordering::SeqCst);
            if self.repush {
                self.repush = false;
                events.push(Event::with_payload(
                    EventKind::FlashRequest,
                    EventPayload::Flash {
                        x: 1,
                        y: 2,
                        glyph: '*',
                    },
                ));
            }
        }
        fn update(&mut self, _world: &World, _events: &EventQueue, _dt: f64) {}
    }

    #[test]
    fn events_pushed_during_tick_arrive_next_tick() {
        let received = Arc::new(AtomicU64::new(0));
        let mut scheduler = Scheduler::new();
        scheduler.register(Box::new(EventSink {
            received: received.clone(),
            repush: true,
        }));

        let world = world();
        scheduler.queue().push(Event::with_payload(
            EventKind::FlashRequest,
            EventPayload::Flash {
                x: 1,
                y: 2,
                glyph: '*',
            },
        ));

        scheduler.tick(&world, 0.016);
        assert_eq!(received.load(Ordering::SeqCst), 1, "repush not delivered yet");

        scheduler.tick(&world, 0.016);
        assert_eq!(received.load(Ordering::SeqCst), 2);

        scheduler.tick(&world, 0.016);
        assert_eq!(received.load(Ordering::SeqCst), 2, "no further events");
    }

    #[test]
    fn dispatch_immediate_bypasses_queue() {
        let received = Arc::new(AtomicU64::new(0));
        let mut scheduler = Scheduler::new();
        scheduler.register(Box::new(EventSink {
            received: received.clone(),
            repush: false,
        }));

        let world = world();
        scheduler.dispatch_immediate(
            &world,
            Event::with_payload(
                EventKind::FlashRequest,
                EventPayload::Flash {
                    x: 1,
                    y: 2,
                    glyph: '*',
                },
            ),
        );
        assert_eq!(received.load(Ordering::SeqCst), 1);
        assert!(scheduler.queue().is_empty());
    }

    #[test]
    fn frame_counter_advances_per_tick() {
        let mut scheduler = Scheduler::new();
        let world = world();
        assert_eq!(scheduler.frame(), 0);
        scheduler.tick(&world, 0.016);
        scheduler.tick(&world, 0.016);
        assert_eq!(scheduler.frame(), 2);
        assert_eq!(scheduler.queue().current_frame(), 2);
    }
}
