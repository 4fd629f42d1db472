//! Output timeline placement
//!
//! Samples carry presentation timestamps relative to the session start, but the
//! encoders consume constant-rate streams. These helpers map timestamps onto
//! frame slots (video) and sample-frame positions (audio).

use std::time::Duration;

/// Where a video frame lands on the constant-frame-rate timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePlacement {
    /// The frame's slot is already filled; it replaces the held frame
    Coalesce,
    /// Emit the frame after repeating the previous frame this many times
    Emit { repeat_previous: u64 },
}

/// Maps video timestamps to constant-frame-rate slots
#[derive(Debug, Clone)]
pub struct FramePacer {
    frame_rate: u32,
    next_slot: u64,
    max_gap_slots: u64,
}

impl FramePacer {
    pub fn new(frame_rate: u32) -> Self {
        let frame_rate = frame_rate.max(1);
        Self {
            frame_rate,
            next_slot: 0,
            max_gap_slots: frame_rate as u64 * 10,
        }
    }

    /// Place a frame captured `offset` after the session start
    pub fn place(&mut self, offset: Duration) -> FramePlacement {
        let slot = (offset.as_secs_f64() * self.frame_rate as f64).round() as u64;
        if slot < self.next_slot {
            return FramePlacement::Coalesce;
        }

        // Long stalls are shortened rather than filled with minutes of a frozen frame
        let gap = (slot - self.next_slot).min(self.max_gap_slots);
        self.next_slot += gap + 1;
        FramePlacement::Emit {
            repeat_previous: gap,
        }
    }

    /// Number of slots emitted so far
    pub fn emitted(&self) -> u64 {
        self.next_slot
    }
}

/// Maps audio timestamps to sample-frame positions
#[derive(Debug, Clone)]
pub struct AudioAligner {
    sample_rate: u32,
    next_frame: u64,
    started: bool,
    tolerance_frames: u64,
    max_silence_frames: u64,
}

impl AudioAligner {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            next_frame: 0,
            started: false,
            tolerance_frames: sample_rate as u64 / 50,
            max_silence_frames: sample_rate as u64 * 10,
        }
    }

    /// Silent sample frames to insert before a chunk of `frames` captured
    /// `offset` after the session start
    pub fn place(&mut self, offset: Duration, frames: u64) -> u64 {
        let expected = (offset.as_secs_f64() * self.sample_rate as f64).round() as u64;
        let gap = expected.saturating_sub(self.next_frame);

        let silence = if !self.started || gap > self.tolerance_frames {
            gap.min(self.max_silence_frames)
        } else {
            0
        };

        self.started = true;
        self.next_frame += silence + frames;
        silence
    }

    /// Sample frames emitted so far, silence included
    pub fn position(&self) -> u64 {
        self.next_frame
    }
}
