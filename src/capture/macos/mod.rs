//! macOS capture implementations
//!
//! CoreGraphics for display discovery, AVFoundation (through FFmpeg) for the
//! screen grab and cpal for the microphone.

pub mod permissions;
pub mod screen;

pub use permissions::ensure_screen_access;
pub use screen::{get_displays, primary_display, screen_input_args};

pub use crate::capture::audio::{default_microphone, start_microphone};
