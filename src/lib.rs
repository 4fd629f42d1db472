//! Screen Recorder - screen and microphone capture into one container file.
//!
//! This is the library crate behind the `screen-recorder` binary. It provides
//! the capture session controller and everything it drives: the capture
//! graph, the container writer and the recording events.

pub mod capture;
pub mod config;
pub mod recorder;
pub mod utils;
pub mod writer;

#[cfg(test)]
mod testing;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use config::RecorderConfig;
pub use recorder::{CaptureController, RecordingError, RecordingEvent, RecordingOutput};

/// Initialize tracing/logging
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "screen_recorder=debug,screen_recorder_lib=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
