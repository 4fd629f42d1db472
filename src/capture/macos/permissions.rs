//! macOS permission handling
//!
//! Screen capture needs the Screen Recording privacy permission.

use crate::recorder::error::{RecordingError, RecordingResult};
use core_graphics::access::ScreenCaptureAccess;

/// Check if screen recording permission is granted
pub fn has_screen_recording_permission() -> bool {
    ScreenCaptureAccess.preflight()
}

/// Request screen recording permission
///
/// The system shows the prompt; returns whether permission is already granted.
pub fn request_screen_recording_permission() -> bool {
    ScreenCaptureAccess.request()
}

/// Fail unless screen recording is permitted, prompting the user if it is not
pub fn ensure_screen_access() -> RecordingResult<()> {
    if has_screen_recording_permission() {
        return Ok(());
    }

    tracing::warn!("Screen recording permission not granted, requesting it");
    request_screen_recording_permission();
    Err(RecordingError::Capture(
        "Screen recording permission not granted. Please allow it in System Settings > Privacy & Security > Screen Recording.".to_string(),
    ))
}
