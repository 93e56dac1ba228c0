//! Real-time audio command channel.
//!
//! The simulation never talks to the audio engine directly; it pushes
//! [`AudioCommand`]s into a bounded single-producer/single-consumer channel.
//! Audio is advisory: when the channel is full the command is dropped and the
//! `audio.dropped` status counter is bumped. Sends never block the tick loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::status::{StatusRegistry, KEY_AUDIO_DROPPED};

// ---------------------------------------------------------------------------
// AudioCommand
// ---------------------------------------------------------------------------

/// What sound to play (or stop).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioKind {
    /// Cleaner launch sweep.
    Whoosh,
    /// Target destruction.
    Impact,
    /// Gold word completion.
    Chime,
    /// Stop all playback (reset choreography).
    StopAll,
}

/// A timestamped command for the audio engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioCommand {
    /// What to play.
    pub kind: AudioKind,
    /// Mixing priority; higher wins when the engine has to choose.
    pub priority: u8,
    /// Monotonic send counter, for discarding stale commands engine-side.
    pub generation: u64,
    /// Game time at which the command was issued.
    pub timestamp: Duration,
}

// ---------------------------------------------------------------------------
// AudioHandle
// ---------------------------------------------------------------------------

/// Producer side of the audio channel. Cheap to clone.
#[derive(Clone)]
pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    generation: Arc<AtomicU64>,
    status: Arc<StatusRegistry>,
}

impl AudioHandle {
    /// Non-blocking send. On a full channel the command is dropped and the
    /// drop counter incremented.
    pub fn send_real_time(&self, kind: AudioKind, priority: u8, timestamp: Duration) {
        let command = AudioCommand {
            kind,
            priority,
            generation: self.generation.fetch_add(1, Ordering::SeqCst),
            timestamp,
        };
        match self.tx.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.status.incr(KEY_AUDIO_DROPPED, 1);
                tracing::trace!(?kind, "audio command dropped");
            }
        }
    }
}

/// Build a bounded audio channel.
///
/// Returns the simulation-side handle and the engine-side receiver.
pub fn audio_channel(
    capacity: usize,
    status: Arc<StatusRegistry>,
) -> (AudioHandle, Receiver<AudioCommand>) {
    let (tx, rx) = bounded(capacity);
    (
        AudioHandle {
            tx,
            generation: Arc::new(AtomicU64::new(0)),
            status,
        },
        rx,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
