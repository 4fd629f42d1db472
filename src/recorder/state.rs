//! Recording state management
//!
//! The bundle of state that exists only while a recording is active, and the
//! summary produced once it is finalized.

use super::events::StatsSnapshot;
use crate::capture::sample::MediaTime;
use crate::writer::AssetWriter;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Timing of one recording
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    /// Duration in milliseconds
    pub duration_ms: f64,

    /// Unix timestamp when recording started
    pub unix_start_ms: u64,

    /// Unix timestamp when recording ended
    pub unix_end_ms: u64,
}

impl RecordingSession {
    /// Create a session starting now
    pub fn new() -> Self {
        let now = Utc::now().timestamp_millis() as u64;
        Self {
            duration_ms: 0.0,
            unix_start_ms: now,
            unix_end_ms: now,
        }
    }

    /// End the session
    pub fn end(&mut self, duration_ms: f64) {
        self.duration_ms = duration_ms;
        self.unix_end_ms = Utc::now().timestamp_millis() as u64;
    }
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Writer and timing for the recording in flight
///
/// Exists exactly while a recording is active; the processing queue checks for
/// it once per sample instead of touching writer fields individually.
pub struct ActiveRecording {
    pub writer: Box<dyn AssetWriter>,
    pub output_path: PathBuf,
    pub session_start: Option<MediaTime>,
    pub session: RecordingSession,
    pub started_at: Instant,
}

impl ActiveRecording {
    pub fn new(writer: Box<dyn AssetWriter>) -> Self {
        Self {
            output_path: writer.output_path().to_path_buf(),
            writer,
            session_start: None,
            session: RecordingSession::new(),
            started_at: Instant::now(),
        }
    }
}

/// Result of a completed recording
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingOutput {
    /// Path to the finalized container file
    pub path: PathBuf,

    /// Timing of the recording
    pub session: RecordingSession,

    /// Presentation time that became time zero of the file
    pub session_start: Option<MediaTime>,

    /// Samples written per track
    pub video_samples: u64,
    pub audio_samples: u64,

    /// Counters at the end of the recording
    pub stats: StatsSnapshot,

    /// Writer failure that cut the recording short
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writer_error: Option<String>,
}

impl RecordingOutput {
    /// Sidecar metadata file written next to the recording
    pub fn sidecar_path(&self) -> PathBuf {
        self.path.with_extension("json")
    }

    /// Write the sidecar metadata file
    pub fn write_sidecar(&self) -> std::io::Result<PathBuf> {
        let path = self.sidecar_path();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        tracing::debug!("Wrote recording metadata to {:?}", path);
        Ok(path)
    }

    /// Read a sidecar metadata file
    pub fn read_sidecar(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_session_end_sets_duration() {
        let mut session = RecordingSession::new();
        session.end(1500.0);
        assert_eq!(session.duration_ms, 1500.0);
        assert!(session.unix_end_ms >= session.unix_start_ms);
    }

    #[test]
    fn test_sidecar_round_trip() {
        let dir = tempdir().unwrap();
        let output = RecordingOutput {
            path: dir.path().join("recording-1.mov"),
            session: RecordingSession::new(),
            session_start: Some(MediaTime::from_millis(40)),
            video_samples: 10,
            audio_samples: 20,
            stats: StatsSnapshot::default(),
            writer_error: Some("video track: encoder pipe closed".to_string()),
        };

        let sidecar = output.write_sidecar().unwrap();
        assert_eq!(sidecar, dir.path().join("recording-1.json"));

        let loaded = RecordingOutput::read_sidecar(&sidecar).unwrap();
        assert_eq!(loaded.video_samples, 10);
        assert_eq!(loaded.session_start, Some(MediaTime::from_millis(40)));
        assert_eq!(loaded.writer_error.as_deref(), Some("video track: encoder pipe closed"));
    }
}
