//! FFmpeg-backed container writer
//!
//! Each track pipes raw samples into its own FFmpeg encoder process writing a
//! temporary file next to the output. A track is fed from a bounded queue, and
//! reports not ready while that queue is full. Finalizing closes both encoders
//! and muxes the streams that came out whole into the output container with a
//! stream copy.

use super::timeline::{AudioAligner, FramePacer, FramePlacement};
use super::{
    AppendOutcome, AssetWriter, FinishedWriting, TrackSettings, WriterFactory, WriterStatus,
};
use crate::capture::sample::{AudioChunk, MediaKind, MediaTime, SampleBuffer, SamplePayload, VideoFrame};
use crate::config::{AudioSettings, VideoSettings};
use crate::recorder::error::{RecordingError, RecordingResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Creates `FfmpegAssetWriter`s
#[derive(Debug, Clone)]
pub struct FfmpegWriterFactory {
    ffmpeg: String,
}

impl FfmpegWriterFactory {
    pub fn new() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
        }
    }

    /// Use a specific FFmpeg executable
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            ffmpeg: program.into(),
        }
    }
}

impl Default for FfmpegWriterFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl WriterFactory for FfmpegWriterFactory {
    fn create_writer(&self, output_path: &Path) -> RecordingResult<Box<dyn AssetWriter>> {
        Ok(Box::new(FfmpegAssetWriter::new(&self.ffmpeg, output_path)))
    }
}

/// Appends a video encoder can fall behind by before the track reports not ready
const VIDEO_QUEUE_DEPTH: usize = 4;

/// Appends an audio encoder can fall behind by before the track reports not ready
const AUDIO_QUEUE_DEPTH: usize = 64;

/// Bytes for an encoder, written `copies` times in a row
struct Packet {
    data: Arc<Vec<u8>>,
    copies: u64,
}

impl Packet {
    fn once(data: Arc<Vec<u8>>) -> Self {
        Self { data, copies: 1 }
    }
}

/// An FFmpeg process fed from a bounded queue by its own thread
///
/// The processing queue only ever hands batches over with `try_send`, so a
/// slow encoder shows up as a full queue instead of a blocked pipe write.
struct PipeEncoder {
    process: Child,
    queue: mpsc::Sender<Vec<Packet>>,
    feeder: JoinHandle<std::io::Result<u64>>,
}

impl PipeEncoder {
    fn spawn(ffmpeg: &str, name: &str, args: &[String], depth: usize) -> std::io::Result<Self> {
        tracing::debug!("Starting FFmpeg {} encoder: {:?}", name, args);

        let mut process = Command::new(ffmpeg)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let Some(stdin) = process.stdin.take() else {
            let _ = process.kill();
            let _ = process.wait();
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "FFmpeg stdin unavailable",
            ));
        };

        let (queue, rx) = mpsc::channel(depth.max(1));
        let feeder = std::thread::Builder::new()
            .name(format!("{}-encoder", name))
            .spawn(move || feed(stdin, rx));
        let feeder = match feeder {
            Ok(handle) => handle,
            Err(e) => {
                let _ = process.kill();
                let _ = process.wait();
                return Err(e);
            }
        };

        Ok(Self {
            process,
            queue,
            feeder,
        })
    }

    /// Whether another batch can be queued without waiting
    fn has_capacity(&self) -> bool {
        self.queue.capacity() > 0
    }

    fn submit(&self, batch: Vec<Packet>) -> Result<(), String> {
        if batch.is_empty() {
            return Ok(());
        }
        self.queue.try_send(batch).map_err(|e| match e {
            TrySendError::Full(_) => "encoder queue is full".to_string(),
            TrySendError::Closed(_) => "encoder pipe closed".to_string(),
        })
    }

    /// Drain the queue, close stdin and wait for the encoder to flush its output
    ///
    /// The process is always waited on, even when feeding it failed.
    fn finish(self) -> RecordingResult<u64> {
        let Self {
            process,
            queue,
            feeder,
        } = self;
        drop(queue);

        let fed = match feeder.join() {
            Ok(result) => result.map_err(|e| format!("encoder pipe closed: {}", e)),
            Err(_) => Err("encoder feed thread panicked".to_string()),
        };

        let output = process.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecordingError::Writer(format!(
                "FFmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let bytes = fed.map_err(RecordingError::Writer)?;
        tracing::debug!("FFmpeg encoder finished after {} bytes", bytes);
        Ok(bytes)
    }
}

/// Write queued batches into the encoder's stdin until the queue closes
fn feed(mut stdin: ChildStdin, mut rx: mpsc::Receiver<Vec<Packet>>) -> std::io::Result<u64> {
    let mut written = 0u64;
    while let Some(batch) = rx.blocking_recv() {
        for packet in batch {
            for _ in 0..packet.copies {
                stdin.write_all(&packet.data)?;
                written += packet.data.len() as u64;
            }
        }
    }
    stdin.flush()?;
    Ok(written)
}

/// Last frame placed on the video timeline
struct HeldFrame {
    width: u32,
    height: u32,
    data: Arc<Vec<u8>>,
    /// Whether the frame reached the encoder queue
    written: bool,
}

struct VideoTrack {
    settings: VideoSettings,
    temp_path: PathBuf,
    encoder: Option<PipeEncoder>,
    pacer: FramePacer,
    held: Option<HeldFrame>,
    /// Distinct captured frames handed to the encoder
    written: u64,
    /// Frames superseded before they reached the encoder
    replaced: u64,
    finished: bool,
}

impl VideoTrack {
    fn new(settings: VideoSettings, temp_path: PathBuf) -> Self {
        Self {
            pacer: FramePacer::new(settings.frame_rate),
            settings,
            temp_path,
            encoder: None,
            held: None,
            written: 0,
            replaced: 0,
            finished: false,
        }
    }

    /// Place a frame on the constant-rate timeline, returning the writes it needs
    ///
    /// A frame that lands in a filled slot is held back as filler for a later
    /// gap. If another frame takes its place first, it never reaches the file
    /// and the outcome is `Replaced`.
    fn place(
        &mut self,
        offset: std::time::Duration,
        frame: VideoFrame,
    ) -> Result<(Vec<Packet>, AppendOutcome), String> {
        let expected = VideoFrame::expected_len(frame.width, frame.height);
        if frame.data.len() < expected {
            return Err(format!(
                "video frame holds {} bytes, expected {}",
                frame.data.len(),
                expected
            ));
        }
        if let Some(held) = &self.held {
            if (held.width, held.height) != (frame.width, frame.height) {
                return Err(format!(
                    "video frame size changed from {}x{} to {}x{}",
                    held.width, held.height, frame.width, frame.height
                ));
            }
        }

        let VideoFrame {
            width,
            height,
            mut data,
        } = frame;
        data.truncate(expected);
        let data = Arc::new(data);

        let mut outcome = AppendOutcome::Queued;
        let mut packets = Vec::new();
        let written = match self.pacer.place(offset) {
            FramePlacement::Coalesce => {
                if self.held.as_ref().is_some_and(|held| !held.written) {
                    outcome = AppendOutcome::Replaced;
                }
                false
            }
            FramePlacement::Emit { repeat_previous } => {
                match self.held.as_mut() {
                    Some(held) if repeat_previous > 0 => {
                        if !held.written {
                            held.written = true;
                            self.written += 1;
                        }
                        packets.push(Packet {
                            data: held.data.clone(),
                            copies: repeat_previous,
                        });
                    }
                    Some(held) if !held.written => outcome = AppendOutcome::Replaced,
                    Some(_) => {}
                    // Before the first frame there is nothing to hold, so the gap shows this frame
                    None if repeat_previous > 0 => packets.push(Packet {
                        data: data.clone(),
                        copies: repeat_previous,
                    }),
                    None => {}
                }
                packets.push(Packet::once(data.clone()));
                self.written += 1;
                true
            }
        };

        if outcome == AppendOutcome::Replaced {
            self.replaced += 1;
        }
        self.held = Some(HeldFrame {
            width,
            height,
            data,
            written,
        });
        Ok((packets, outcome))
    }
}

struct AudioTrack {
    settings: AudioSettings,
    temp_path: PathBuf,
    encoder: Option<PipeEncoder>,
    aligner: Option<AudioAligner>,
    format: Option<(u32, u16)>,
    appended: u64,
    finished: bool,
}

/// Temporary files that survived finishing the encoders
#[derive(Debug, Default)]
struct FinishedTracks {
    video: Option<PathBuf>,
    audio: Option<PathBuf>,
    errors: Vec<String>,
}

/// Container writer driving one FFmpeg encoder per track
pub struct FfmpegAssetWriter {
    ffmpeg: String,
    output_path: PathBuf,
    status: WriterStatus,
    error: Option<String>,
    session_start: Option<MediaTime>,
    video: Option<VideoTrack>,
    audio: Option<AudioTrack>,
}

impl FfmpegAssetWriter {
    pub fn new(ffmpeg: &str, output_path: &Path) -> Self {
        Self {
            ffmpeg: ffmpeg.to_string(),
            output_path: output_path.to_path_buf(),
            status: WriterStatus::Unknown,
            error: None,
            session_start: None,
            video: None,
            audio: None,
        }
    }

    fn temp_path(&self, suffix: &str) -> PathBuf {
        let stem = self
            .output_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "recording".to_string());
        self.output_path.with_file_name(format!("{}.{}", stem, suffix))
    }

    /// Move to `failed`, keeping the first error
    fn fail(&mut self, message: String) -> RecordingError {
        if self.status != WriterStatus::Failed {
            tracing::error!("Writer for {:?} failed: {}", self.output_path, message);
            self.status = WriterStatus::Failed;
            self.error = Some(message.clone());
        }
        RecordingError::Writer(message)
    }

    fn append_video(
        &mut self,
        offset: std::time::Duration,
        frame: VideoFrame,
    ) -> Result<AppendOutcome, String> {
        let ffmpeg = self.ffmpeg.clone();
        let track = self.video.as_mut().ok_or("no video track")?;

        let (width, height) = (frame.width, frame.height);
        let (packets, outcome) = track.place(offset, frame)?;
        if packets.is_empty() {
            return Ok(outcome);
        }

        if track.encoder.is_none() {
            let args = video_encoder_args(width, height, &track.settings, &track.temp_path);
            let encoder = PipeEncoder::spawn(&ffmpeg, "video", &args, VIDEO_QUEUE_DEPTH)
                .map_err(|e| format!("failed to start video encoder: {}", e))?;
            tracing::info!(
                "Video encoder started: {}x{} -> {}x{}",
                width,
                height,
                track.settings.width,
                track.settings.height
            );
            track.encoder = Some(encoder);
        }

        let encoder = track.encoder.as_ref().ok_or("video encoder missing")?;
        encoder
            .submit(packets)
            .map_err(|e| format!("video {}", e))?;

        if track.written % 300 == 0 {
            tracing::debug!(
                "Video track: {} frames written, {} replaced, {} slots emitted",
                track.written,
                track.replaced,
                track.pacer.emitted()
            );
        }
        Ok(outcome)
    }

    fn append_audio(
        &mut self,
        offset: std::time::Duration,
        chunk: AudioChunk,
    ) -> Result<AppendOutcome, String> {
        let ffmpeg = self.ffmpeg.clone();
        let track = self.audio.as_mut().ok_or("no audio track")?;

        match track.format {
            None => {
                if chunk.sample_rate == 0 || chunk.channels == 0 {
                    return Err(format!(
                        "invalid audio format {}Hz/{}ch",
                        chunk.sample_rate, chunk.channels
                    ));
                }
                track.format = Some((chunk.sample_rate, chunk.channels));
                track.aligner = Some(AudioAligner::new(chunk.sample_rate));
            }
            Some(format) if format != (chunk.sample_rate, chunk.channels) => {
                return Err(format!(
                    "audio format changed from {}Hz/{}ch to {}Hz/{}ch",
                    format.0, format.1, chunk.sample_rate, chunk.channels
                ));
            }
            Some(_) => {}
        }

        if track.encoder.is_none() {
            let args = audio_encoder_args(chunk.sample_rate, chunk.channels, &track.settings, &track.temp_path);
            let encoder = PipeEncoder::spawn(&ffmpeg, "audio", &args, AUDIO_QUEUE_DEPTH)
                .map_err(|e| format!("failed to start audio encoder: {}", e))?;
            tracing::info!(
                "Audio encoder started: {}Hz {}ch",
                chunk.sample_rate,
                chunk.channels
            );
            track.encoder = Some(encoder);
        }

        let aligner = track.aligner.as_mut().ok_or("audio aligner missing")?;
        let silence = aligner.place(offset, chunk.frames() as u64);

        let mut bytes = vec![0u8; silence as usize * chunk.channels as usize * 4];
        bytes.reserve(chunk.samples.len() * 4);
        bytes.extend(chunk.samples.iter().flat_map(|&sample| sample.to_le_bytes()));

        let encoder = track.encoder.as_ref().ok_or("audio encoder missing")?;
        encoder
            .submit(vec![Packet::once(Arc::new(bytes))])
            .map_err(|e| format!("audio {}", e))?;

        track.appended += 1;
        Ok(AppendOutcome::Queued)
    }

    /// Finish both encoders, keeping the temporary files that came out whole
    ///
    /// A failing encoder never stops the other one from being finished.
    fn finish_tracks(&mut self) -> FinishedTracks {
        let mut finished = FinishedTracks::default();

        if let Some(track) = self.video.as_mut() {
            track.finished = true;
            if track.held.as_ref().is_some_and(|held| !held.written) {
                track.replaced += 1;
            }
            finished.video = finish_track(
                MediaKind::Video,
                track.encoder.take(),
                &track.temp_path,
                &mut finished.errors,
            );
        }

        if let Some(track) = self.audio.as_mut() {
            track.finished = true;
            finished.audio = finish_track(
                MediaKind::Audio,
                track.encoder.take(),
                &track.temp_path,
                &mut finished.errors,
            );
        }

        finished
    }

    fn remove_temp_files(&self) {
        let temps = [
            self.video.as_ref().map(|t| &t.temp_path),
            self.audio.as_ref().map(|t| &t.temp_path),
        ];
        for path in temps.into_iter().flatten() {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::warn!("Failed to remove temporary file {:?}: {}", path, e);
                }
            }
        }
    }
}

/// Finish one track's encoder, returning its temporary file if it is usable
fn finish_track(
    kind: MediaKind,
    encoder: Option<PipeEncoder>,
    temp_path: &Path,
    errors: &mut Vec<String>,
) -> Option<PathBuf> {
    let encoder = encoder?;
    match encoder.finish() {
        Ok(_) => {
            let has_content = std::fs::metadata(temp_path)
                .map(|meta| meta.len() > 0)
                .unwrap_or(false);
            if has_content {
                Some(temp_path.to_path_buf())
            } else {
                errors.push(format!("{} encoder produced no output", kind));
                None
            }
        }
        Err(e) => {
            tracing::warn!("Dropping {} track: {}", kind, e);
            errors.push(format!("{} track: {}", kind, e));
            None
        }
    }
}

impl AssetWriter for FfmpegAssetWriter {
    fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn status(&self) -> WriterStatus {
        self.status
    }

    fn error(&self) -> Option<String> {
        self.error.clone()
    }

    fn can_add_track(&self, settings: &TrackSettings) -> bool {
        if self.status != WriterStatus::Unknown {
            return false;
        }
        match settings {
            TrackSettings::Video { settings, .. } => {
                self.video.is_none() && settings.width > 0 && settings.height > 0
            }
            TrackSettings::Audio { .. } => self.audio.is_none(),
        }
    }

    fn add_track(&mut self, settings: TrackSettings) {
        match settings {
            TrackSettings::Video { settings, .. } => {
                let temp_path = self.temp_path("video.mp4");
                self.video = Some(VideoTrack::new(settings, temp_path));
            }
            TrackSettings::Audio { settings, .. } => {
                self.audio = Some(AudioTrack {
                    temp_path: self.temp_path("audio.m4a"),
                    settings,
                    encoder: None,
                    aligner: None,
                    format: None,
                    appended: 0,
                    finished: false,
                });
            }
        }
    }

    fn start_writing(&mut self) -> RecordingResult<()> {
        if self.status != WriterStatus::Unknown {
            return Err(RecordingError::Writer(format!(
                "cannot start writing from {:?}",
                self.status
            )));
        }
        if self.video.is_none() && self.audio.is_none() {
            return Err(self.fail("writer has no tracks".to_string()));
        }

        match Command::new(&self.ffmpeg).arg("-version").output() {
            Ok(output) if output.status.success() => {}
            Ok(output) => {
                return Err(self.fail(format!("FFmpeg is not usable: {}", output.status)));
            }
            Err(e) => {
                return Err(self.fail(format!("FFmpeg not found: {}", e)));
            }
        }

        if let Some(parent) = self.output_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return Err(self.fail(format!("cannot create {:?}: {}", parent, e)));
            }
        }

        self.status = WriterStatus::Writing;
        tracing::info!("Writer started for {:?}", self.output_path);
        Ok(())
    }

    fn start_session(&mut self, at: MediaTime) {
        self.session_start = Some(at);
    }

    fn is_ready_for_more_media_data(&self, kind: MediaKind) -> bool {
        if self.status != WriterStatus::Writing {
            return false;
        }
        let (finished, encoder) = match kind {
            MediaKind::Video => match self.video.as_ref() {
                Some(track) => (track.finished, track.encoder.as_ref()),
                None => return false,
            },
            MediaKind::Audio => match self.audio.as_ref() {
                Some(track) => (track.finished, track.encoder.as_ref()),
                None => return false,
            },
        };
        !finished && encoder.map_or(true, PipeEncoder::has_capacity)
    }

    fn append(&mut self, sample: SampleBuffer) -> RecordingResult<AppendOutcome> {
        if self.status != WriterStatus::Writing {
            return Err(RecordingError::Writer(format!(
                "cannot append while {:?}",
                self.status
            )));
        }
        let kind = sample.kind();
        if !self.is_ready_for_more_media_data(kind) {
            return Err(RecordingError::Writer(format!("{} track is not ready", kind)));
        }
        let Some(session_start) = self.session_start else {
            return Err(RecordingError::Writer("session has not started".to_string()));
        };

        let offset = sample.pts.saturating_since(session_start);
        let result = match sample.payload {
            SamplePayload::Video(frame) => self.append_video(offset, frame),
            SamplePayload::Audio(chunk) => self.append_audio(offset, chunk),
        };
        result.map_err(|message| self.fail(message))
    }

    fn mark_as_finished(&mut self, kind: MediaKind) {
        match kind {
            MediaKind::Video => {
                if let Some(track) = self.video.as_mut() {
                    track.finished = true;
                }
            }
            MediaKind::Audio => {
                if let Some(track) = self.audio.as_mut() {
                    track.finished = true;
                }
            }
        }
    }

    fn finish_writing(mut self: Box<Self>) -> RecordingResult<FinishedWriting> {
        let tracks = self.finish_tracks();

        let mut problems: Vec<String> = self.error.iter().cloned().collect();
        problems.extend(tracks.errors);

        if tracks.video.is_none() && tracks.audio.is_none() {
            self.remove_temp_files();
            self.status = WriterStatus::Failed;
            let message = if problems.is_empty() {
                "no samples were written".to_string()
            } else {
                problems.join("; ")
            };
            return Err(RecordingError::Writer(message));
        }

        let args = mux_args(tracks.video.as_deref(), tracks.audio.as_deref(), &self.output_path);
        tracing::info!("Muxing recording: {:?}", args);

        let output = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .output();
        self.remove_temp_files();

        let output = output?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            self.status = WriterStatus::Failed;
            return Err(RecordingError::Writer(format!(
                "FFmpeg mux failed: {}",
                stderr.trim()
            )));
        }

        if self.status == WriterStatus::Writing {
            self.status = WriterStatus::Finished;
        }

        let finished = FinishedWriting {
            path: self.output_path.clone(),
            video_samples: match (&tracks.video, &self.video) {
                (Some(_), Some(track)) => track.written,
                _ => 0,
            },
            audio_samples: match (&tracks.audio, &self.audio) {
                (Some(_), Some(track)) => track.appended,
                _ => 0,
            },
            error: (!problems.is_empty()).then(|| problems.join("; ")),
        };
        match &finished.error {
            Some(error) => tracing::warn!(
                "Recording finalized incomplete: {:?} ({} video, {} audio samples): {}",
                finished.path,
                finished.video_samples,
                finished.audio_samples,
                error
            ),
            None => tracing::info!(
                "Recording finalized: {:?} ({} video, {} audio samples)",
                finished.path,
                finished.video_samples,
                finished.audio_samples
            ),
        }
        Ok(finished)
    }
}

/// FFmpeg arguments encoding raw BGRA frames into the video temp file
fn video_encoder_args(
    source_width: u32,
    source_height: u32,
    settings: &VideoSettings,
    output: &Path,
) -> Vec<String> {
    let kbps = (settings.average_bitrate / 1000).max(1);
    let mut args = vec![
        "-y".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "bgra".to_string(),
        "-s".to_string(),
        format!("{}x{}", source_width, source_height),
        "-r".to_string(),
        settings.frame_rate.to_string(),
        "-i".to_string(),
        "-".to_string(),
    ];

    if (source_width, source_height) != (settings.width, settings.height) {
        args.extend([
            "-vf".to_string(),
            format!(
                "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black",
                w = settings.width,
                h = settings.height
            ),
        ]);
    }

    args.extend([
        "-c:v".to_string(),
        settings.codec.ffmpeg_encoder().to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-b:v".to_string(),
        format!("{}k", kbps),
        "-maxrate".to_string(),
        format!("{}k", kbps),
        "-bufsize".to_string(),
        format!("{}k", kbps * 2),
        "-g".to_string(),
        (settings.frame_rate * 2).to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        output.to_string_lossy().to_string(),
    ]);
    args
}

/// FFmpeg arguments encoding interleaved f32 PCM into the audio temp file
fn audio_encoder_args(
    sample_rate: u32,
    channels: u16,
    settings: &AudioSettings,
    output: &Path,
) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "f32le".to_string(),
        "-ar".to_string(),
        sample_rate.to_string(),
        "-ac".to_string(),
        channels.to_string(),
        "-i".to_string(),
        "-".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
    ];
    if let Some(bitrate) = settings.bitrate {
        args.extend(["-b:a".to_string(), format!("{}k", (bitrate / 1000).max(1))]);
    }
    args.push(output.to_string_lossy().to_string());
    args
}

/// FFmpeg arguments muxing the encoded tracks into the output container
fn mux_args(video: Option<&Path>, audio: Option<&Path>, output: &Path) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ];

    let mut maps = Vec::new();
    for (index, (path, stream)) in [(video, "v"), (audio, "a")]
        .into_iter()
        .filter_map(|(path, stream)| path.map(|p| (p, stream)))
        .enumerate()
    {
        args.extend(["-i".to_string(), path.to_string_lossy().to_string()]);
        maps.extend(["-map".to_string(), format!("{}:{}", index, stream)]);
    }

    args.extend(maps);
    args.extend([
        "-c".to_string(),
        "copy".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        output.to_string_lossy().to_string(),
    ]);
    args
}
