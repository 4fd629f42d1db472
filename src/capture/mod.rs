//! Screen and microphone capture
//!
//! This module provides the capture graph and its platform-specific device
//! discovery and sources.

pub mod clock;
pub mod graph;
pub mod sample;
pub mod session;
pub mod traits;

#[cfg(any(target_os = "macos", target_os = "windows"))]
pub mod audio;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub mod linux;

#[cfg(target_os = "macos")]
use self::macos as platform;

#[cfg(target_os = "windows")]
use self::windows as platform;

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
use self::linux as platform;

pub use clock::CaptureClock;
pub use graph::{configure_capture_graph, ConfiguredGraph};
pub use sample::{AudioChunk, MediaKind, MediaTime, SampleBuffer, SamplePayload, VideoFrame};
pub use session::FfmpegCaptureSession;
pub use traits::{
    AudioDeviceInfo, CaptureInput, CaptureOutput, CaptureSession, DisplayInfo, SampleDelegate,
    VideoOutputSettings,
};

/// Displays available for capture
pub fn get_displays() -> Vec<DisplayInfo> {
    platform::get_displays()
}

/// The display a recording captures
pub fn primary_display() -> Option<DisplayInfo> {
    platform::primary_display()
}

/// The microphone a recording captures
pub fn default_microphone() -> Option<AudioDeviceInfo> {
    platform::default_microphone()
}
