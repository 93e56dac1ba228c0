//! Frame-tagged typed events.
//!
//! Events are the decoupled input to the scheduler: the input layer and the
//! systems themselves push [`Event`]s onto the [`EventQueue`]; the scheduler
//! drains the queue at the start of each tick and fans every event out to the
//! systems subscribed to its [`EventKind`].
//!
//! Every event is tagged with the frame number current at push time. Events
//! pushed during a tick are therefore delivered on the *next* tick, and
//! systems that must not double-handle a request (the cleaner) deduplicate on
//! the frame tag.
//!
//! Payloads are a closed tagged union. A subscriber that finds the wrong
//! payload shape drops the event and bumps the `events.payload_mismatch`
//! status counter -- the accessor helpers return `Option` for exactly that
//! pattern.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// Closed enumeration of event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Spawn row-sweep cleaners over every row holding a Red target.
    CleanerRequest,
    /// Spawn four cleaners outward from an origin cell.
    DirectionalCleanerRequest,
    /// All cleaners from the last request are gone (or none ever spawned).
    CleanerFinished,
    /// Turn the cursor shield on.
    ShieldActivate,
    /// Turn the cursor shield off.
    ShieldDeactivate,
    /// One-off shield drain (costed action while shielded).
    ShieldDrain,
    /// Add (or, negative, remove) cursor energy.
    EnergyAdd,
    /// Spawn a transient flash cell.
    FlashRequest,
    /// Atomic world reset. Dispatched synchronously, never queued.
    GameReset,
    /// Compose the debug overlay.
    DebugRequest,
    /// Compose the help overlay.
    HelpRequest,
    /// A gold sequence appeared on the grid.
    GoldSpawned,
    /// The gold window closed (timeout, completion, or placement failure).
    GoldExpired,
    /// Force a decay wave (debug path).
    DecayTick,
}

// ---------------------------------------------------------------------------
// EventPayload
// ---------------------------------------------------------------------------

/// Typed payload attached to an event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// No payload.
    None,
    /// Grid origin, used by `DirectionalCleanerRequest`.
    Origin {
        /// Origin column.
        x: i32,
        /// Origin row.
        y: i32,
    },
    /// Signed energy delta, used by `EnergyAdd` and `ShieldDrain`.
    Energy {
        /// Amount to add; negative values drain.
        amount: i64,
    },
    /// Flash cell description, used by `FlashRequest`.
    Flash {
        /// Flash column.
        x: i32,
        /// Flash row.
        y: i32,
        /// Glyph to blink.
        glyph: char,
    },
    /// Gold sequence identifier, used by `GoldSpawned` / `GoldExpired`.
    Gold {
        /// The sequence id of the gold word.
        sequence_id: u64,
    },
}

impl EventPayload {
    /// Origin coordinates, if this is an `Origin` payload.
    pub fn origin(&self) -> Option<(i32, i32)> {
        match *self {
            EventPayload::Origin { x, y } => Some((x, y)),
            _ => None,
        }
    }

    /// Energy delta, if this is an `Energy` payload.
    pub fn energy(&self) -> Option<i64> {
        match *self {
            EventPayload::Energy { amount } => Some(amount),
            _ => None,
        }
    }

    /// Flash description, if this is a `Flash` payload.
    pub fn flash(&self) -> Option<(i32, i32, char)> {
        match *self {
            EventPayload::Flash { x, y, glyph } => Some((x, y, glyph)),
            _ => None,
        }
    }

    /// Gold sequence id, if this is a `Gold` payload.
    pub fn gold(&self) -> Option<u64> {
        match *self {
            EventPayload::Gold { sequence_id } => Some(sequence_id),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A frame-tagged event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// Frame number current when the event was pushed. Set by the queue.
    pub frame: u64,
    /// Typed payload.
    pub payload: EventPayload,
}

impl Event {
    /// Payload-less event. The frame tag is assigned on push.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            frame: 0,
            payload: EventPayload::None,
        }
    }

    /// Event with a payload. The frame tag is assigned on push.
    pub fn with_payload(kind: EventKind, payload: EventPayload) -> Self {
        Self {
            kind,
            frame: 0,
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// EventQueue
// ---------------------------------------------------------------------------

/// FIFO queue of pending events.
///
/// `push` stamps the event with the current frame number (maintained by the
/// scheduler via [`set_frame`](Self::set_frame)). `drain` empties the queue in
/// push order.
pub struct EventQueue {
    pending: Mutex<VecDeque<Event>>,
    frame: AtomicU64,
}

impl EventQueue {
    /// Create an empty queue at frame 0.
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            frame: AtomicU64::new(0),
        }
    }

    /// Record the current frame number for tagging future pushes.
    pub fn set_frame(&self, frame: u64) {
        self.frame.store(frame, Ordering::SeqCst);
    }

    /// The frame number pushes are currently tagged with.
    pub fn current_frame(&self) -> u64 {
        self.frame.load(Ordering::SeqCst)
    }

    /// Push an event, stamping it with the current frame.
    pub fn push(&self, mut event: Event) {
        event.frame = self.frame.load(Ordering::SeqCst);
        self.pending.lock().push_back(event);
    }

    /// Remove and return all pending events in push order.
    pub fn drain(&self) -> Vec<Event> {
        self.pending.lock().drain(..).collect()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether no events are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
