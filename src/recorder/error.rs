//! Recording errors
//!
//! Every failure of the capture/mux core is reported through `RecordingError`.

use crate::capture::sample::MediaKind;
use thiserror::Error;

/// Errors that can occur while setting up or running a recording
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("No display available for screen capture")]
    DisplayNotFound,

    #[error("No audio input device available")]
    AudioDeviceNotFound,

    #[error("Cannot add capture input: {0}")]
    CannotAddInput(String),

    #[error("Cannot add capture output: {0}")]
    CannotAddOutput(String),

    #[error("Writer cannot accept a {0} track")]
    CannotAddTrack(MediaKind),

    #[error("Already recording")]
    AlreadyRecording,

    #[error("Not recording")]
    NotRecording,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Writer error: {0}")]
    Writer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Capture controller has shut down")]
    ControllerClosed,
}

impl RecordingError {
    /// Whether this error means a required capture device could not be resolved
    pub fn is_device_resolution(&self) -> bool {
        matches!(
            self,
            RecordingError::DisplayNotFound | RecordingError::AudioDeviceNotFound
        )
    }
}

/// Result type for recording operations
pub type RecordingResult<T> = Result<T, RecordingError>;
