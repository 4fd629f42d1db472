//! Sample routing
//!
//! Every sample delivered by the capture graph passes through `route_sample` on
//! the processing queue. The writer's state decides what happens to it:
//!
//! | writer    | action                                                    |
//! |-----------|-----------------------------------------------------------|
//! | none      | drop silently                                             |
//! | unknown   | start writing, start the session at this sample's pts, do not append it |
//! | failed    | report the error, drop                                    |
//! | writing   | append if the sample's track is ready, otherwise drop     |
//!
//! An appended sample may take the place of an earlier one the writer had not
//! written yet; that earlier sample counts as dropped.
//! | finished  | drop                                                      |

use super::state::ActiveRecording;
use crate::capture::sample::{MediaKind, MediaTime, SampleBuffer};
use crate::writer::{AppendOutcome, WriterStatus};

/// What happened to a routed sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// No recording is active
    NoWriter,
    /// The sample started the writer session and was consumed
    SessionStarted(MediaTime),
    /// The sample was appended to its track
    Appended(MediaKind),
    /// The sample was appended in place of an earlier one that is now dropped
    Replaced(MediaKind),
    /// The track was not ready; the sample was dropped
    NotReady(MediaKind),
    /// The writer is failed; the sample was dropped
    WriterFailed(String),
    /// The writer is already finished; the sample was dropped
    WriterClosed,
}

/// Route one sample into the active recording
pub fn route_sample(active: Option<&mut ActiveRecording>, sample: SampleBuffer) -> RouteOutcome {
    let Some(active) = active else {
        return RouteOutcome::NoWriter;
    };

    match active.writer.status() {
        WriterStatus::Unknown => {
            if let Err(e) = active.writer.start_writing() {
                return RouteOutcome::WriterFailed(
                    active.writer.error().unwrap_or_else(|| e.to_string()),
                );
            }
            let at = sample.pts;
            active.writer.start_session(at);
            active.session_start = Some(at);
            RouteOutcome::SessionStarted(at)
        }
        WriterStatus::Failed => RouteOutcome::WriterFailed(
            active
                .writer
                .error()
                .unwrap_or_else(|| "unknown writer error".to_string()),
        ),
        WriterStatus::Writing => {
            let kind = sample.kind();
            if !active.writer.is_ready_for_more_media_data(kind) {
                return RouteOutcome::NotReady(kind);
            }
            match active.writer.append(sample) {
                Ok(AppendOutcome::Queued) => RouteOutcome::Appended(kind),
                Ok(AppendOutcome::Replaced) => RouteOutcome::Replaced(kind),
                Err(e) => RouteOutcome::WriterFailed(
                    active.writer.error().unwrap_or_else(|| e.to_string()),
                ),
            }
        }
        WriterStatus::Finished => RouteOutcome::WriterClosed,
    }
}
