//! Windows capture implementations
//!
//! GDI for display discovery, gdigrab (through FFmpeg) for the screen grab
//! and cpal for the microphone.

pub mod screen;

pub use screen::{ensure_screen_access, get_displays, primary_display, screen_input_args};

pub use crate::capture::audio::{default_microphone, start_microphone};
