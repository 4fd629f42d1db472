//! Recording system module
//!
//! This module implements the capture session controller:
//! - CaptureController with its serial processing queue
//! - the sample routing state machine
//! - recording events, counters and output naming

pub mod controller;
pub mod error;
pub mod events;
pub mod flag;
pub mod naming;
pub mod routing;
pub mod state;

pub use controller::{CaptureController, Completion};
pub use error::{RecordingError, RecordingResult};
pub use events::{CaptureStats, DropReason, RecordingEvent, StatsSnapshot};
pub use state::{RecordingOutput, RecordingSession};
