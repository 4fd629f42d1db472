//! Linux capture implementations
//!
//! xrandr for display discovery, x11grab (through FFmpeg) for the screen grab
//! and PulseAudio (through FFmpeg) for the microphone.

pub mod microphone;
pub mod screen;

pub use microphone::{default_microphone, start_microphone};
pub use screen::{ensure_screen_access, get_displays, primary_display, screen_input_args};
