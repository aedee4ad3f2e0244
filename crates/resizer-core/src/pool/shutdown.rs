//! Per-pool shutdown signal shared with every worker.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Observable phase of a [`ShutdownSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    /// No stop requested
    Idle,
    /// Stop requested: workers finish the queue, then exit
    Draining,
    /// Stop requested: workers finish their current task and exit without
    /// popping again
    Aborting,
    /// Every worker has exited
    Stopped,
}

const IDLE: u8 = 0;
const DRAINING: u8 = 1;
const ABORTING: u8 = 2;
const STOPPED: u8 = 3;

/// Which kind of stop to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    Graceful,
    Hard,
}

/// Cancellation token scoped to one pool instance.
///
/// Cloning is cheap; all clones observe the same state. The signal moves
/// forward only: Idle → Draining/Aborting → Stopped. A graceful request may
/// still be escalated to a hard one.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    state: Arc<AtomicU8>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Returns `true` if the state changed.
    pub fn request(&self, mode: StopMode) -> bool {
        let target = match mode {
            StopMode::Graceful => DRAINING,
            StopMode::Hard => ABORTING,
        };
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < target).then_some(target)
            })
            .is_ok()
    }

    /// Record that every worker has exited.
    pub fn mark_stopped(&self) {
        self.state.store(STOPPED, Ordering::Release);
    }

    pub fn state(&self) -> ShutdownState {
        match self.state.load(Ordering::Acquire) {
            IDLE => ShutdownState::Idle,
            DRAINING => ShutdownState::Draining,
            ABORTING => ShutdownState::Aborting,
            _ => ShutdownState::Stopped,
        }
    }

    /// Whether any stop has been requested.
    pub fn is_requested(&self) -> bool {
        self.state.load(Ordering::Acquire) != IDLE
    }

    /// Whether workers must stop popping new tasks.
    pub fn is_hard_stop(&self) -> bool {
        self.state.load(Ordering::Acquire) == ABORTING
    }
}
