//! Capture trait definitions
//!
//! Platform-agnostic description of the capture graph: devices, inputs,
//! outputs, the session that owns them and the delegate that receives samples.

use crate::capture::sample::{MediaKind, SampleBuffer};
use crate::recorder::error::RecordingResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Information about a display/screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayInfo {
    /// Unique display ID
    pub id: u32,

    /// Display name
    pub name: String,

    /// Native width in pixels
    pub width: u32,

    /// Native height in pixels
    pub height: u32,

    /// Scale factor (e.g., 2.0 for Retina)
    pub scale_factor: f64,

    /// Whether this is the primary display
    pub is_primary: bool,
}

/// Information about an audio device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDeviceInfo {
    /// Unique device ID
    pub id: String,

    /// Device name
    pub name: String,

    /// Whether this is the default device
    pub is_default: bool,
}

/// A source feeding the capture graph
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureInput {
    Screen(DisplayInfo),
    Microphone(AudioDeviceInfo),
}

impl CaptureInput {
    pub fn kind(&self) -> MediaKind {
        match self {
            CaptureInput::Screen(_) => MediaKind::Video,
            CaptureInput::Microphone(_) => MediaKind::Audio,
        }
    }
}

/// Settings for the video sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoOutputSettings {
    /// Delivered pixel width
    pub width: u32,

    /// Delivered pixel height
    pub height: u32,

    /// Frame rate requested from the screen source
    pub frame_rate: u32,

    /// Whether frames that arrive while the queue is backed up are discarded
    pub discards_late_frames: bool,
}

/// A sink delivering raw samples to application code
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutput {
    Video(VideoOutputSettings),
    Audio,
}

impl CaptureOutput {
    pub fn kind(&self) -> MediaKind {
        match self {
            CaptureOutput::Video(_) => MediaKind::Video,
            CaptureOutput::Audio => MediaKind::Audio,
        }
    }
}

/// Receives samples from the capture graph
///
/// Called from capture threads. Implementations must only hand the sample off;
/// they never touch writer state directly.
pub trait SampleDelegate: Send + Sync {
    /// A sample was captured
    fn did_output(&self, sample: SampleBuffer);

    /// The capture layer discarded a sample before delivering it
    fn did_drop(&self, kind: MediaKind);

    /// Number of delivered samples not yet processed
    fn backlog(&self) -> usize {
        0
    }
}

/// The live graph of capture inputs and outputs
///
/// Inputs and outputs may only change between `begin_configuration` and
/// `commit_configuration`; the session must be committed before it runs.
pub trait CaptureSession: Send {
    /// Resolve the primary display
    fn primary_display(&self) -> Option<DisplayInfo>;

    /// Resolve the default audio input device
    fn default_audio_input(&self) -> Option<AudioDeviceInfo>;

    /// Open a configuration transaction
    fn begin_configuration(&mut self);

    /// Close the configuration transaction, making it effective
    fn commit_configuration(&mut self) -> RecordingResult<()>;

    /// Close the configuration transaction, discarding every input and output
    fn abort_configuration(&mut self);

    /// Remove all inputs and outputs (configuration transaction only)
    fn remove_all(&mut self);

    fn can_add_input(&self, input: &CaptureInput) -> bool;

    fn add_input(&mut self, input: CaptureInput);

    fn can_add_output(&self, output: &CaptureOutput) -> bool;

    fn add_output(&mut self, output: CaptureOutput);

    /// Register the receiver for samples of every output
    fn set_sample_delegate(&mut self, delegate: Arc<dyn SampleDelegate>);

    /// Begin delivering samples
    fn start_running(&mut self) -> RecordingResult<()>;

    /// Stop delivering samples
    fn stop_running(&mut self);

    fn is_running(&self) -> bool;
}
