//! Recorder configuration
//!
//! The fixed output profile (H.264, 720x1280, ~2.3 Mbit/s) is the default;
//! every field can be overridden from a JSON file or the command line.

use crate::utils::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Output container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    #[default]
    Mov,
    Mp4,
}

impl ContainerFormat {
    /// Get the file extension for this container
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Mov => "mov",
            ContainerFormat::Mp4 => "mp4",
        }
    }
}

/// Video codec for the encoded track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    #[default]
    H264,
    Hevc,
}

impl VideoCodec {
    /// Get the FFmpeg encoder for this codec
    pub fn ffmpeg_encoder(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "libx264",
            VideoCodec::Hevc => "libx265",
        }
    }
}

impl std::str::FromStr for VideoCodec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "h264" | "avc" => Ok(VideoCodec::H264),
            "hevc" | "h265" => Ok(VideoCodec::Hevc),
            other => Err(format!("unknown video codec '{}'", other)),
        }
    }
}

/// Video track settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoSettings {
    pub codec: VideoCodec,

    /// Encode width in pixels
    pub width: u32,

    /// Encode height in pixels
    pub height: u32,

    /// Target average bitrate in bits per second
    pub average_bitrate: u32,

    /// Output frame rate
    pub frame_rate: u32,

    /// Encode at the captured display's size instead of `width` x `height`
    pub match_display: bool,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            codec: VideoCodec::H264,
            width: 720,
            height: 1280,
            average_bitrate: 2_300_000,
            frame_rate: 30,
            match_display: false,
        }
    }
}

/// Audio track settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioSettings {
    /// AAC bitrate in bits per second; encoder default when absent
    pub bitrate: Option<u32>,
}

/// Configuration for the capture controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    /// Directory receiving the recordings
    pub output_dir: PathBuf,

    pub container: ContainerFormat,

    pub video: VideoSettings,

    pub audio: AudioSettings,

    /// Whether the video sink discards frames when processing falls behind
    pub discards_late_video_frames: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            container: ContainerFormat::default(),
            video: VideoSettings::default(),
            audio: AudioSettings::default(),
            discards_late_video_frames: false,
        }
    }
}

impl RecorderConfig {
    /// Load a configuration file; missing fields take their defaults
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RecorderConfig = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::debug!("Loaded recorder config from {:?}", path);
        Ok(config)
    }

    /// Reject settings no encoder can honour
    pub fn validate(&self) -> AppResult<()> {
        if self.video.width == 0 || self.video.height == 0 {
            return Err(AppError::Config(format!(
                "Invalid encode size {}x{}",
                self.video.width, self.video.height
            )));
        }
        if self.video.width % 2 != 0 || self.video.height % 2 != 0 {
            return Err(AppError::Config(format!(
                "Encode size {}x{} must be even",
                self.video.width, self.video.height
            )));
        }
        if self.video.average_bitrate == 0 {
            return Err(AppError::Config("Video bitrate must be positive".to_string()));
        }
        if self.video.frame_rate == 0 || self.video.frame_rate > 240 {
            return Err(AppError::Config(format!(
                "Frame rate {} out of range",
                self.video.frame_rate
            )));
        }
        if self.audio.bitrate == Some(0) {
            return Err(AppError::Config("Audio bitrate must be positive".to_string()));
        }
        Ok(())
    }
}

/// Shared, user-visible location for recordings on this platform
pub fn default_output_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        PathBuf::from("/Users/Shared")
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var_os("PUBLIC")
            .map(|public| PathBuf::from(public).join("Videos"))
            .unwrap_or_else(std::env::temp_dir)
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join("Videos"))
            .unwrap_or_else(std::env::temp_dir)
    }
}
