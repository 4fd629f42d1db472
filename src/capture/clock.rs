//! Capture clock
//!
//! Screen frames and microphone chunks come from independently clocked
//! sources. Both are stamped from one monotonic origin so their presentation
//! timestamps share a timeline.

use crate::capture::sample::MediaTime;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct CaptureClock {
    origin: Instant,
}

impl CaptureClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Current time on the capture timeline
    pub fn now(&self) -> MediaTime {
        MediaTime::from_duration(self.origin.elapsed())
    }

    /// Timestamp of data that finished arriving now but spans `duration`
    pub fn started_ago(&self, duration: Duration) -> MediaTime {
        let elapsed = self.origin.elapsed().saturating_sub(duration);
        MediaTime::from_duration(elapsed)
    }
}

impl Default for CaptureClock {
    fn default() -> Self {
        Self::new()
    }
}
