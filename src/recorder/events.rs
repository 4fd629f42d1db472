//! Recording events and counters
//!
//! Per-sample problems are never raised as errors mid-stream; they surface here
//! as broadcast events and counters.

use super::state::RecordingOutput;
use crate::capture::sample::{MediaKind, MediaTime};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Why a sample never reached its track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DropReason {
    /// Discarded by the capture layer before routing
    Capture,
    /// The track input was not ready for more data
    NotReady,
    /// A later sample took its place before the writer wrote it
    Replaced,
}

/// Events emitted during recording
#[derive(Debug, Clone)]
pub enum RecordingEvent {
    /// Capture is running and the writer is set up
    Started { path: PathBuf },
    /// The first sample set time zero of the output file
    SessionStarted { at: MediaTime },
    /// The output file is finalized
    Stopped { output: RecordingOutput },
    /// A sample was dropped
    FrameDropped { kind: MediaKind, reason: DropReason },
    /// A sample arrived while the writer was failed
    WriterFailed { error: String },
    /// Setup or finalize error
    Error(String),
}

#[derive(Debug, Default)]
struct KindCounters {
    appended: AtomicU64,
    dropped_by_capture: AtomicU64,
    dropped_not_ready: AtomicU64,
    dropped_replaced: AtomicU64,
}

/// Live counters for the current recording
#[derive(Debug, Default)]
pub struct CaptureStats {
    kinds: [KindCounters; 2],
    writer_errors: AtomicU64,
}

impl CaptureStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        for counters in &self.kinds {
            counters.appended.store(0, Ordering::Relaxed);
            counters.dropped_by_capture.store(0, Ordering::Relaxed);
            counters.dropped_not_ready.store(0, Ordering::Relaxed);
            counters.dropped_replaced.store(0, Ordering::Relaxed);
        }
        self.writer_errors.store(0, Ordering::Relaxed);
    }

    pub fn record_appended(&self, kind: MediaKind) {
        self.kinds[kind.index()].appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, kind: MediaKind, reason: DropReason) {
        let counters = &self.kinds[kind.index()];
        match reason {
            DropReason::Capture => counters.dropped_by_capture.fetch_add(1, Ordering::Relaxed),
            DropReason::NotReady => counters.dropped_not_ready.fetch_add(1, Ordering::Relaxed),
            DropReason::Replaced => counters.dropped_replaced.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn record_writer_error(&self) {
        self.writer_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn appended(&self, kind: MediaKind) -> u64 {
        self.kinds[kind.index()].appended.load(Ordering::Relaxed)
    }

    pub fn dropped(&self, kind: MediaKind, reason: DropReason) -> u64 {
        let counters = &self.kinds[kind.index()];
        match reason {
            DropReason::Capture => counters.dropped_by_capture.load(Ordering::Relaxed),
            DropReason::NotReady => counters.dropped_not_ready.load(Ordering::Relaxed),
            DropReason::Replaced => counters.dropped_replaced.load(Ordering::Relaxed),
        }
    }

    pub fn writer_errors(&self) -> u64 {
        self.writer_errors.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let track = |kind| TrackStats {
            appended: self.appended(kind),
            dropped_by_capture: self.dropped(kind, DropReason::Capture),
            dropped_not_ready: self.dropped(kind, DropReason::NotReady),
            dropped_replaced: self.dropped(kind, DropReason::Replaced),
        };
        StatsSnapshot {
            video: track(MediaKind::Video),
            audio: track(MediaKind::Audio),
            writer_errors: self.writer_errors(),
        }
    }
}

/// Counters for one track
///
/// `appended` counts samples the writer accepted; those later replaced are
/// also counted in `dropped_replaced`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStats {
    pub appended: u64,
    pub dropped_by_capture: u64,
    pub dropped_not_ready: u64,
    #[serde(default)]
    pub dropped_replaced: u64,
}

/// Point-in-time copy of `CaptureStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub video: TrackStats,
    pub audio: TrackStats,
    pub writer_errors: u64,
}
