//! PulseAudio microphone capture through FFmpeg
//!
//! FFmpeg reads the default PulseAudio source and writes interleaved f32 PCM
//! to stdout; a reader thread cuts it into 10 ms chunks.

use crate::capture::clock::CaptureClock;
use crate::capture::sample::{AudioChunk, SampleBuffer};
use crate::capture::session::{read_full, FfmpegSource, RunningSource};
use crate::capture::traits::{AudioDeviceInfo, SampleDelegate};
use crate::recorder::error::RecordingResult;
use std::io::Read;
use std::process::Command;
use std::sync::Arc;

const SAMPLE_RATE: u32 = 48_000;
const CHANNELS: u16 = 2;
const CHUNK_FRAMES: usize = (SAMPLE_RATE / 100) as usize;

/// Get the default PulseAudio source
pub fn default_microphone() -> Option<AudioDeviceInfo> {
    let output = match Command::new("pactl").arg("get-default-source").output() {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!("Failed to run pactl: {}", e);
            return None;
        }
    };
    if !output.status.success() {
        tracing::warn!("pactl exited with {}", output.status);
        return None;
    }

    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if name.is_empty() {
        return None;
    }
    if name.ends_with(".monitor") {
        tracing::warn!("Default source '{}' is a monitor, not a microphone", name);
    }
    Some(AudioDeviceInfo {
        id: name.clone(),
        name,
        is_default: true,
    })
}

/// Open `device` and deliver its audio to `delegate` until stopped
pub fn start_microphone(
    ffmpeg: &str,
    device: &AudioDeviceInfo,
    clock: CaptureClock,
    delegate: Arc<dyn SampleDelegate>,
) -> RecordingResult<Box<dyn RunningSource>> {
    let args = vec![
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "pulse".to_string(),
        "-i".to_string(),
        device.id.clone(),
        "-ac".to_string(),
        CHANNELS.to_string(),
        "-ar".to_string(),
        SAMPLE_RATE.to_string(),
        "-f".to_string(),
        "f32le".to_string(),
        "-".to_string(),
    ];

    let source = FfmpegSource::spawn(ffmpeg, "microphone", &args, move |stdout| {
        read_pcm_chunks(stdout, clock, delegate)
    })?;
    Ok(Box::new(source))
}

fn read_pcm_chunks(mut stdout: impl Read, clock: CaptureClock, delegate: Arc<dyn SampleDelegate>) {
    let frame_bytes = CHANNELS as usize * 4;
    let mut buf = vec![0u8; CHUNK_FRAMES * frame_bytes];
    let mut chunks = 0u64;

    loop {
        let filled = match read_full(&mut stdout, &mut buf) {
            Ok(filled) => filled,
            Err(e) => {
                tracing::error!("Microphone read failed: {}", e);
                break;
            }
        };
        let usable = filled - filled % frame_bytes;
        if usable == 0 {
            break;
        }

        let chunk = AudioChunk {
            sample_rate: SAMPLE_RATE,
            channels: CHANNELS,
            samples: buf[..usable]
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        };
        let pts = clock.started_ago(chunk.duration());
        delegate.did_output(SampleBuffer::audio(pts, chunk));
        chunks += 1;

        if filled < buf.len() {
            break;
        }
    }

    tracing::info!("Microphone capture ended after {} chunks", chunks);
}
