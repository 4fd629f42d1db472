//! Container writer
//!
//! An `AssetWriter` owns one output file and its video and audio tracks. Its
//! lifecycle is `unknown` -> `writing` -> `finished`, with `failed` reachable
//! from any non-terminal state. A writer is used for exactly one recording.

pub mod ffmpeg;
pub mod timeline;

use crate::capture::sample::{MediaKind, MediaTime, SampleBuffer};
use crate::capture::traits::DisplayInfo;
use crate::config::{AudioSettings, RecorderConfig, VideoSettings};
use crate::recorder::error::{RecordingError, RecordingResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use ffmpeg::{FfmpegAssetWriter, FfmpegWriterFactory};

/// Lifecycle state of a writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriterStatus {
    /// Created, not yet told to start
    Unknown,
    /// Accepting samples
    Writing,
    /// Finalized; the file is complete
    Finished,
    /// Terminal error
    Failed,
}

/// Settings for one encoded track
#[derive(Debug, Clone, PartialEq)]
pub enum TrackSettings {
    Video {
        settings: VideoSettings,
        expects_real_time: bool,
    },
    Audio {
        settings: AudioSettings,
        expects_real_time: bool,
    },
}

impl TrackSettings {
    pub fn kind(&self) -> MediaKind {
        match self {
            TrackSettings::Video { .. } => MediaKind::Video,
            TrackSettings::Audio { .. } => MediaKind::Audio,
        }
    }
}

/// What `append` did with a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Accepted for its track
    Queued,
    /// Accepted in place of an earlier sample of the track that never reached the file
    Replaced,
}

/// What a writer produced once finalized
#[derive(Debug, Clone)]
pub struct FinishedWriting {
    pub path: PathBuf,
    /// Samples that reached the file, per track
    pub video_samples: u64,
    pub audio_samples: u64,
    /// Failure that cut the file short; it holds what was written before it
    pub error: Option<String>,
}

/// Writes timestamped samples into a container file
pub trait AssetWriter: Send {
    fn output_path(&self) -> &Path;

    fn status(&self) -> WriterStatus;

    /// Description of the failure when `status()` is `Failed`
    fn error(&self) -> Option<String>;

    fn can_add_track(&self, settings: &TrackSettings) -> bool;

    fn add_track(&mut self, settings: TrackSettings);

    /// Move from `unknown` to `writing`; moves to `failed` on error
    fn start_writing(&mut self) -> RecordingResult<()>;

    /// Set time zero of the output file
    fn start_session(&mut self, at: MediaTime);

    /// Whether the track of `kind` can take another sample without blocking
    fn is_ready_for_more_media_data(&self, kind: MediaKind) -> bool;

    /// Append a sample to its track; moves to `failed` on error
    fn append(&mut self, sample: SampleBuffer) -> RecordingResult<AppendOutcome>;

    /// No more samples will be appended to the track of `kind`
    fn mark_as_finished(&mut self, kind: MediaKind);

    /// Close every track and complete the container file
    ///
    /// A writer that failed mid-recording still finalizes what it wrote before
    /// the failure and reports the failure in `FinishedWriting::error`.
    fn finish_writing(self: Box<Self>) -> RecordingResult<FinishedWriting>;
}

/// Creates a fresh writer per recording
pub trait WriterFactory: Send {
    fn create_writer(&self, output_path: &Path) -> RecordingResult<Box<dyn AssetWriter>>;
}

/// Encode size for the video track
///
/// The fixed encode size is used unless `match_display` asks for the display's
/// own size; a mismatch in aspect ratio is logged since the frame gets padded.
pub fn encode_size(video: &VideoSettings, display: &DisplayInfo) -> (u32, u32) {
    if video.match_display {
        // Encoders need even dimensions
        return (display.width & !1, display.height & !1);
    }

    let (display_width, display_height) = (display.width, display.height);
    if (display_width >= display_height) != (video.width >= video.height) {
        tracing::warn!(
            "Encode size {}x{} does not match display {}x{} orientation; frames will be letterboxed",
            video.width,
            video.height,
            display_width,
            display_height
        );
    }
    (video.width, video.height)
}

/// Create the writer for one recording with its video and audio tracks
pub fn setup_writer(
    factory: &dyn WriterFactory,
    output_path: &Path,
    config: &RecorderConfig,
    display: &DisplayInfo,
) -> RecordingResult<Box<dyn AssetWriter>> {
    let mut writer = factory.create_writer(output_path)?;

    let (width, height) = encode_size(&config.video, display);
    let video = TrackSettings::Video {
        settings: VideoSettings {
            width,
            height,
            ..config.video.clone()
        },
        expects_real_time: true,
    };
    let audio = TrackSettings::Audio {
        settings: config.audio.clone(),
        expects_real_time: true,
    };

    for track in [video, audio] {
        if !writer.can_add_track(&track) {
            return Err(RecordingError::CannotAddTrack(track.kind()));
        }
        writer.add_track(track);
    }

    tracing::info!(
        "Writer ready for {:?}: {:?} {}x{} @ {} bps",
        output_path,
        config.video.codec,
        width,
        height,
        config.video.average_bitrate
    );
    Ok(writer)
}
