//! FFmpeg-backed capture session
//!
//! The screen is grabbed by an FFmpeg subprocess emitting raw BGRA frames at
//! the video sink's size; a reader thread stamps each frame with the shared
//! capture clock and hands it to the sample delegate. The microphone comes
//! from the platform audio source.

use super::clock::CaptureClock;
use super::platform;
use super::sample::{MediaKind, SampleBuffer, VideoFrame};
use super::traits::{
    AudioDeviceInfo, CaptureInput, CaptureOutput, CaptureSession, DisplayInfo, SampleDelegate,
    VideoOutputSettings,
};
use crate::recorder::error::{RecordingError, RecordingResult};
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Queued-but-unprocessed samples above which late frames are discarded
const LATE_FRAME_BACKLOG: usize = 8;

/// A capture source producing samples until stopped
pub trait RunningSource: Send {
    fn name(&self) -> &str;

    /// Stop producing samples and release the device
    fn stop(self: Box<Self>);
}

/// An FFmpeg subprocess whose stdout is consumed by a reader thread
pub struct FfmpegSource {
    name: String,
    child: Child,
    reader: Option<JoinHandle<()>>,
}

impl FfmpegSource {
    /// Spawn `ffmpeg args...` and run `read` on its stdout in a thread
    pub fn spawn<F>(ffmpeg: &str, name: &str, args: &[String], read: F) -> RecordingResult<Self>
    where
        F: FnOnce(ChildStdout) + Send + 'static,
    {
        tracing::debug!("Starting {} source: {} {:?}", name, ffmpeg, args);

        let mut child = Command::new(ffmpeg)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RecordingError::Capture(format!("Failed to start {}: {}", name, e)))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            RecordingError::Capture(format!("{} has no stdout", name))
        })?;
        if let Some(stderr) = child.stderr.take() {
            log_stderr(name, stderr);
        }

        let reader = std::thread::Builder::new()
            .name(format!("{}-reader", name))
            .spawn(move || read(stdout));
        let reader = match reader {
            Ok(handle) => handle,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e.into());
            }
        };

        Ok(Self {
            name: name.to_string(),
            child,
            reader: Some(reader),
        })
    }
}

impl RunningSource for FfmpegSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn stop(mut self: Box<Self>) {
        if let Err(e) = self.child.kill() {
            tracing::debug!("{} already exited: {}", self.name, e);
        }
        let _ = self.child.wait();
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                tracing::error!("{} reader thread panicked", self.name);
            }
        }
        tracing::info!("{} source stopped", self.name);
    }
}

/// Forward an FFmpeg process' stderr to the log
fn log_stderr(name: &str, stderr: ChildStderr) {
    let name = name.to_string();
    let spawned = std::thread::Builder::new()
        .name(format!("{}-stderr", name))
        .spawn(move || {
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                if !line.trim().is_empty() {
                    tracing::warn!("{}: {}", name, line);
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!("Cannot log FFmpeg stderr: {}", e);
    }
}

/// Fill `buf` from `reader`, returning how many bytes were read before EOF
pub(crate) fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// FFmpeg output arguments for raw BGRA frames at the sink size
fn screen_output_args(settings: &VideoOutputSettings) -> Vec<String> {
    vec![
        "-vf".to_string(),
        format!("scale={}:{}", settings.width, settings.height),
        "-pix_fmt".to_string(),
        "bgra".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-".to_string(),
    ]
}

/// Read raw frames from `stdout` until EOF, delivering them to `delegate`
fn read_screen_frames(
    mut stdout: impl Read,
    settings: VideoOutputSettings,
    clock: CaptureClock,
    delegate: Arc<dyn SampleDelegate>,
) {
    let frame_len = VideoFrame::expected_len(settings.width, settings.height);
    let mut frames = 0u64;

    loop {
        let mut data = vec![0u8; frame_len];
        let filled = match read_full(&mut stdout, &mut data) {
            Ok(filled) => filled,
            Err(e) => {
                tracing::error!("Screen capture read failed: {}", e);
                break;
            }
        };
        if filled == 0 {
            break;
        }
        if filled < frame_len {
            tracing::warn!("Short screen frame ({} of {} bytes)", filled, frame_len);
            delegate.did_drop(MediaKind::Video);
            break;
        }

        let pts = clock.now();
        if settings.discards_late_frames && delegate.backlog() > LATE_FRAME_BACKLOG {
            delegate.did_drop(MediaKind::Video);
            continue;
        }

        delegate.did_output(SampleBuffer::video(
            pts,
            VideoFrame {
                width: settings.width,
                height: settings.height,
                data,
            },
        ));
        frames += 1;
        if frames == 1 {
            tracing::info!("Screen capture: first frame received");
        }
    }

    tracing::info!("Screen capture ended after {} frames", frames);
}

/// The live capture graph backed by FFmpeg and the platform audio stack
pub struct FfmpegCaptureSession {
    ffmpeg: String,
    configuring: bool,
    committed: bool,
    inputs: Vec<CaptureInput>,
    outputs: Vec<CaptureOutput>,
    delegate: Option<Arc<dyn SampleDelegate>>,
    running: Vec<Box<dyn RunningSource>>,
}

impl FfmpegCaptureSession {
    pub fn new() -> Self {
        Self::with_program("ffmpeg")
    }

    /// Use a specific FFmpeg executable
    pub fn with_program(ffmpeg: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            configuring: false,
            committed: false,
            inputs: Vec::new(),
            outputs: Vec::new(),
            delegate: None,
            running: Vec::new(),
        }
    }

    fn input(&self, kind: MediaKind) -> Option<&CaptureInput> {
        self.inputs.iter().find(|i| i.kind() == kind)
    }

    fn output(&self, kind: MediaKind) -> Option<&CaptureOutput> {
        self.outputs.iter().find(|o| o.kind() == kind)
    }

    fn start_screen(
        &self,
        display: &DisplayInfo,
        settings: VideoOutputSettings,
        clock: CaptureClock,
        delegate: Arc<dyn SampleDelegate>,
    ) -> RecordingResult<Box<dyn RunningSource>> {
        platform::ensure_screen_access()?;

        let mut args = vec!["-loglevel".to_string(), "error".to_string()];
        args.extend(platform::screen_input_args(display, settings.frame_rate));
        args.extend(screen_output_args(&settings));

        let source = FfmpegSource::spawn(&self.ffmpeg, "screen", &args, move |stdout| {
            read_screen_frames(stdout, settings, clock, delegate)
        })?;
        Ok(Box::new(source))
    }

    fn start_sources(
        &self,
        delegate: Arc<dyn SampleDelegate>,
    ) -> RecordingResult<Vec<Box<dyn RunningSource>>> {
        let clock = CaptureClock::new();
        let mut sources: Vec<Box<dyn RunningSource>> = Vec::new();

        if let (Some(CaptureInput::Screen(display)), Some(CaptureOutput::Video(settings))) =
            (self.input(MediaKind::Video), self.output(MediaKind::Video))
        {
            sources.push(self.start_screen(display, *settings, clock, delegate.clone())?);
        }

        if let (Some(CaptureInput::Microphone(device)), Some(CaptureOutput::Audio)) =
            (self.input(MediaKind::Audio), self.output(MediaKind::Audio))
        {
            match platform::start_microphone(&self.ffmpeg, device, clock, delegate) {
                Ok(source) => sources.push(source),
                Err(e) => {
                    for source in sources {
                        source.stop();
                    }
                    return Err(e);
                }
            }
        }

        Ok(sources)
    }
}

impl Default for FfmpegCaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSession for FfmpegCaptureSession {
    fn primary_display(&self) -> Option<DisplayInfo> {
        platform::primary_display()
    }

    fn default_audio_input(&self) -> Option<AudioDeviceInfo> {
        platform::default_microphone()
    }

    fn begin_configuration(&mut self) {
        self.configuring = true;
    }

    fn commit_configuration(&mut self) -> RecordingResult<()> {
        if !self.configuring {
            return Err(RecordingError::Configuration(
                "No configuration in progress".to_string(),
            ));
        }
        self.configuring = false;
        self.committed = true;
        Ok(())
    }

    fn abort_configuration(&mut self) {
        self.configuring = false;
        self.committed = false;
        self.inputs.clear();
        self.outputs.clear();
        self.delegate = None;
    }

    fn remove_all(&mut self) {
        if !self.configuring {
            tracing::warn!("Ignoring remove_all outside a configuration transaction");
            return;
        }
        self.inputs.clear();
        self.outputs.clear();
    }

    fn can_add_input(&self, input: &CaptureInput) -> bool {
        if !self.configuring || self.input(input.kind()).is_some() {
            return false;
        }
        match input {
            CaptureInput::Screen(display) => display.width > 0 && display.height > 0,
            CaptureInput::Microphone(device) => !device.id.is_empty(),
        }
    }

    fn add_input(&mut self, input: CaptureInput) {
        if !self.configuring {
            tracing::warn!("Ignoring input added outside a configuration transaction");
            return;
        }
        self.inputs.push(input);
    }

    fn can_add_output(&self, output: &CaptureOutput) -> bool {
        if !self.configuring || self.output(output.kind()).is_some() {
            return false;
        }
        match output {
            CaptureOutput::Video(settings) => {
                settings.width > 0 && settings.height > 0 && settings.frame_rate > 0
            }
            CaptureOutput::Audio => true,
        }
    }

    fn add_output(&mut self, output: CaptureOutput) {
        if !self.configuring {
            tracing::warn!("Ignoring output added outside a configuration transaction");
            return;
        }
        self.outputs.push(output);
    }

    fn set_sample_delegate(&mut self, delegate: Arc<dyn SampleDelegate>) {
        self.delegate = Some(delegate);
    }

    fn start_running(&mut self) -> RecordingResult<()> {
        if !self.running.is_empty() {
            return Ok(());
        }
        if self.configuring || !self.committed {
            return Err(RecordingError::Configuration(
                "Capture session must be committed before it runs".to_string(),
            ));
        }
        let delegate = self.delegate.clone().ok_or_else(|| {
            RecordingError::Configuration("No sample delegate registered".to_string())
        })?;

        self.running = self.start_sources(delegate)?;
        if self.running.is_empty() {
            return Err(RecordingError::Configuration(
                "Capture session has no connected inputs".to_string(),
            ));
        }

        let names: Vec<&str> = self.running.iter().map(|s| s.name()).collect();
        tracing::info!("Capture session running: {}", names.join(", "));
        Ok(())
    }

    fn stop_running(&mut self) {
        for source in self.running.drain(..) {
            source.stop();
        }
    }

    fn is_running(&self) -> bool {
        !self.running.is_empty()
    }
}

impl Drop for FfmpegCaptureSession {
    fn drop(&mut self) {
        self.stop_running();
    }
}
