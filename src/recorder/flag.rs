//! Recording flag
//!
//! The only state shared between the caller's context and the processing
//! queue. The low bit says whether recording is on; the remaining bits count
//! transitions so a failed start can roll the flag back without clobbering a
//! later start or stop.

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies the transition that turned recording on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartTicket(u64);

#[derive(Debug, Default)]
pub struct RecordingFlag {
    state: AtomicU64,
}

const RECORDING: u64 = 1;

impl RecordingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.state.load(Ordering::SeqCst) & RECORDING != 0
    }

    /// Turn recording on; `None` when it already was
    pub fn try_start(&self) -> Option<StartTicket> {
        self.state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |state| {
                if state & RECORDING != 0 {
                    None
                } else {
                    Some(next_epoch(state) | RECORDING)
                }
            })
            .ok()
            .map(|previous| StartTicket(next_epoch(previous) | RECORDING))
    }

    /// Turn recording off; false when it already was
    pub fn try_stop(&self) -> bool {
        self.state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |state| {
                if state & RECORDING == 0 {
                    None
                } else {
                    Some(next_epoch(state))
                }
            })
            .is_ok()
    }

    /// Undo the start identified by `ticket` if nothing happened since
    pub fn rollback(&self, ticket: StartTicket) -> bool {
        self.state
            .compare_exchange(
                ticket.0,
                next_epoch(ticket.0),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }
}

/// Following state with the recording bit cleared
fn next_epoch(state: u64) -> u64 {
    (state & !RECORDING).wrapping_add(2)
}
