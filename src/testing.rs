//! Scripted fakes for the capture session and the writer

use crate::capture::sample::{AudioChunk, MediaKind, MediaTime, SampleBuffer, SamplePayload, VideoFrame};
use crate::capture::traits::{
    AudioDeviceInfo, CaptureInput, CaptureOutput, CaptureSession, DisplayInfo, SampleDelegate,
};
use crate::recorder::error::{RecordingError, RecordingResult};
use crate::writer::{
    AppendOutcome, AssetWriter, FinishedWriting, TrackSettings, WriterFactory, WriterStatus,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub fn sample_display() -> DisplayInfo {
    DisplayInfo {
        id: 1,
        name: "Built-in Display".to_string(),
        width: 2880,
        height: 1800,
        scale_factor: 2.0,
        is_primary: true,
    }
}

pub fn sample_microphone() -> AudioDeviceInfo {
    AudioDeviceInfo {
        id: "builtin-mic".to_string(),
        name: "Built-in Microphone".to_string(),
        is_default: true,
    }
}

pub fn video_sample(ms: u64) -> SampleBuffer {
    SampleBuffer {
        pts: MediaTime::from_millis(ms),
        payload: SamplePayload::Video(VideoFrame {
            width: 2,
            height: 2,
            data: vec![0; VideoFrame::expected_len(2, 2)],
        }),
    }
}

pub fn audio_sample(ms: u64) -> SampleBuffer {
    SampleBuffer {
        pts: MediaTime::from_millis(ms),
        payload: SamplePayload::Audio(AudioChunk {
            sample_rate: 48_000,
            channels: 1,
            samples: vec![0.0; 480],
        }),
    }
}

/// Delegate that discards everything
pub struct NullDelegate;

impl SampleDelegate for NullDelegate {
    fn did_output(&self, _sample: SampleBuffer) {}

    fn did_drop(&self, _kind: MediaKind) {}
}

// ---------------------------------------------------------------------------
// Capture session
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SessionState {
    configuring: bool,
    committed: bool,
    running: bool,
    inputs: Vec<CaptureInput>,
    outputs: Vec<CaptureOutput>,
    delegate: Option<Arc<dyn SampleDelegate>>,
    start_error: Option<String>,
    start_count: usize,
    stop_count: usize,
}

/// Handle for inspecting and driving a `FakeCaptureSession` after it is boxed
#[derive(Clone, Default)]
pub struct SessionProbe {
    state: Arc<Mutex<SessionState>>,
}

impl SessionProbe {
    pub fn committed(&self) -> bool {
        self.state.lock().committed
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn start_count(&self) -> usize {
        self.state.lock().start_count
    }

    pub fn stop_count(&self) -> usize {
        self.state.lock().stop_count
    }

    pub fn input_kinds(&self) -> Vec<MediaKind> {
        self.state.lock().inputs.iter().map(CaptureInput::kind).collect()
    }

    pub fn outputs(&self) -> Vec<CaptureOutput> {
        self.state.lock().outputs.clone()
    }

    pub fn has_delegate(&self) -> bool {
        self.state.lock().delegate.is_some()
    }

    /// Make the next `start_running` fail
    pub fn fail_start(&self, message: &str) {
        self.state.lock().start_error = Some(message.to_string());
    }

    /// The delegate registered by the last configuration
    pub fn delegate(&self) -> Option<Arc<dyn SampleDelegate>> {
        self.state.lock().delegate.clone()
    }

    /// Deliver a sample as the capture layer would
    pub fn emit(&self, sample: SampleBuffer) {
        let delegate = self.state.lock().delegate.clone();
        if let Some(delegate) = delegate {
            delegate.did_output(sample);
        }
    }

    /// Report a sample discarded by the capture layer
    pub fn emit_drop(&self, kind: MediaKind) {
        let delegate = self.state.lock().delegate.clone();
        if let Some(delegate) = delegate {
            delegate.did_drop(kind);
        }
    }
}

pub struct FakeCaptureSession {
    display: Option<DisplayInfo>,
    microphone: Option<AudioDeviceInfo>,
    refused_inputs: Vec<MediaKind>,
    refused_outputs: Vec<MediaKind>,
    probe: SessionProbe,
}

impl FakeCaptureSession {
    pub fn new() -> Self {
        Self {
            display: Some(sample_display()),
            microphone: Some(sample_microphone()),
            refused_inputs: Vec::new(),
            refused_outputs: Vec::new(),
            probe: SessionProbe::default(),
        }
    }

    pub fn without_display(mut self) -> Self {
        self.display = None;
        self
    }

    pub fn without_microphone(mut self) -> Self {
        self.microphone = None;
        self
    }

    pub fn refusing_input(mut self, kind: MediaKind) -> Self {
        self.refused_inputs.push(kind);
        self
    }

    pub fn refusing_output(mut self, kind: MediaKind) -> Self {
        self.refused_outputs.push(kind);
        self
    }

    pub fn probe(&self) -> SessionProbe {
        self.probe.clone()
    }
}

impl CaptureSession for FakeCaptureSession {
    fn primary_display(&self) -> Option<DisplayInfo> {
        self.display.clone()
    }

    fn default_audio_input(&self) -> Option<AudioDeviceInfo> {
        self.microphone.clone()
    }

    fn begin_configuration(&mut self) {
        let mut state = self.probe.state.lock();
        state.configuring = true;
        state.committed = false;
    }

    fn commit_configuration(&mut self) -> RecordingResult<()> {
        let mut state = self.probe.state.lock();
        if !state.configuring {
            return Err(RecordingError::Configuration(
                "commit without begin".to_string(),
            ));
        }
        state.configuring = false;
        state.committed = true;
        Ok(())
    }

    fn abort_configuration(&mut self) {
        let mut state = self.probe.state.lock();
        state.configuring = false;
        state.committed = false;
        state.inputs.clear();
        state.outputs.clear();
        state.delegate = None;
    }

    fn remove_all(&mut self) {
        let mut state = self.probe.state.lock();
        assert!(state.configuring, "remove_all outside configuration");
        state.inputs.clear();
        state.outputs.clear();
    }

    fn can_add_input(&self, input: &CaptureInput) -> bool {
        !self.refused_inputs.contains(&input.kind())
    }

    fn add_input(&mut self, input: CaptureInput) {
        let mut state = self.probe.state.lock();
        assert!(state.configuring, "add_input outside configuration");
        state.inputs.push(input);
    }

    fn can_add_output(&self, output: &CaptureOutput) -> bool {
        !self.refused_outputs.contains(&output.kind())
    }

    fn add_output(&mut self, output: CaptureOutput) {
        let mut state = self.probe.state.lock();
        assert!(state.configuring, "add_output outside configuration");
        state.outputs.push(output);
    }

    fn set_sample_delegate(&mut self, delegate: Arc<dyn SampleDelegate>) {
        self.probe.state.lock().delegate = Some(delegate);
    }

    fn start_running(&mut self) -> RecordingResult<()> {
        let mut state = self.probe.state.lock();
        state.start_count += 1;
        if let Some(message) = state.start_error.take() {
            return Err(RecordingError::Capture(message));
        }
        if !state.committed {
            return Err(RecordingError::Configuration(
                "session started before commit".to_string(),
            ));
        }
        state.running = true;
        Ok(())
    }

    fn stop_running(&mut self) {
        let mut state = self.probe.state.lock();
        state.stop_count += 1;
        state.running = false;
    }

    fn is_running(&self) -> bool {
        self.probe.state.lock().running
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

struct WriterState {
    status: WriterStatus,
    error: Option<String>,
    tracks: Vec<TrackSettings>,
    refused_tracks: Vec<MediaKind>,
    session_start: Option<MediaTime>,
    ready: [bool; 2],
    replacing: [bool; 2],
    appended: [Vec<MediaTime>; 2],
    marked_finished: Vec<MediaKind>,
    fail_on_start: Option<String>,
    fail_next_append: Option<String>,
    finished: bool,
}

impl Default for WriterState {
    fn default() -> Self {
        Self {
            status: WriterStatus::Unknown,
            error: None,
            tracks: Vec::new(),
            refused_tracks: Vec::new(),
            session_start: None,
            ready: [true, true],
            replacing: [false, false],
            appended: [Vec::new(), Vec::new()],
            marked_finished: Vec::new(),
            fail_on_start: None,
            fail_next_append: None,
            finished: false,
        }
    }
}

/// Handle for inspecting and scripting a `FakeWriter` after it is boxed
#[derive(Clone, Default)]
pub struct WriterProbe {
    state: Arc<Mutex<WriterState>>,
}

impl WriterProbe {
    pub fn status(&self) -> WriterStatus {
        self.state.lock().status
    }

    pub fn session_start(&self) -> Option<MediaTime> {
        self.state.lock().session_start
    }

    pub fn tracks(&self) -> Vec<TrackSettings> {
        self.state.lock().tracks.clone()
    }

    pub fn appended(&self, kind: MediaKind) -> Vec<MediaTime> {
        self.state.lock().appended[kind.index()].clone()
    }

    pub fn marked_finished(&self) -> Vec<MediaKind> {
        self.state.lock().marked_finished.clone()
    }

    pub fn finished(&self) -> bool {
        self.state.lock().finished
    }

    pub fn set_ready(&self, kind: MediaKind, ready: bool) {
        self.state.lock().ready[kind.index()] = ready;
    }

    /// Report appends of `kind` as taking the place of an unwritten sample
    pub fn set_replacing(&self, kind: MediaKind, replacing: bool) {
        self.state.lock().replacing[kind.index()] = replacing;
    }

    /// Move the writer to `failed` as if the encoder broke
    pub fn fail(&self, message: &str) {
        let mut state = self.state.lock();
        state.status = WriterStatus::Failed;
        state.error = Some(message.to_string());
    }

    pub fn fail_on_start(&self, message: &str) {
        self.state.lock().fail_on_start = Some(message.to_string());
    }

    pub fn fail_next_append(&self, message: &str) {
        self.state.lock().fail_next_append = Some(message.to_string());
    }
}

pub struct FakeWriter {
    path: PathBuf,
    probe: WriterProbe,
}

impl FakeWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            probe: WriterProbe::default(),
        }
    }

    pub fn probe(&self) -> WriterProbe {
        self.probe.clone()
    }
}

impl AssetWriter for FakeWriter {
    fn output_path(&self) -> &Path {
        &self.path
    }

    fn status(&self) -> WriterStatus {
        self.probe.status()
    }

    fn error(&self) -> Option<String> {
        self.probe.state.lock().error.clone()
    }

    fn can_add_track(&self, settings: &TrackSettings) -> bool {
        !self.probe.state.lock().refused_tracks.contains(&settings.kind())
    }

    fn add_track(&mut self, settings: TrackSettings) {
        self.probe.state.lock().tracks.push(settings);
    }

    fn start_writing(&mut self) -> RecordingResult<()> {
        let mut state = self.probe.state.lock();
        if let Some(message) = state.fail_on_start.take() {
            state.status = WriterStatus::Failed;
            state.error = Some(message.clone());
            return Err(RecordingError::Writer(message));
        }
        state.status = WriterStatus::Writing;
        Ok(())
    }

    fn start_session(&mut self, at: MediaTime) {
        self.probe.state.lock().session_start = Some(at);
    }

    fn is_ready_for_more_media_data(&self, kind: MediaKind) -> bool {
        self.probe.state.lock().ready[kind.index()]
    }

    fn append(&mut self, sample: SampleBuffer) -> RecordingResult<AppendOutcome> {
        let mut state = self.probe.state.lock();
        if let Some(message) = state.fail_next_append.take() {
            state.status = WriterStatus::Failed;
            state.error = Some(message.clone());
            return Err(RecordingError::Writer(message));
        }
        if state.status != WriterStatus::Writing {
            return Err(RecordingError::Writer("append while not writing".to_string()));
        }
        let kind = sample.kind();
        if state.marked_finished.contains(&kind) {
            return Err(RecordingError::Writer(format!("{} track already finished", kind)));
        }
        state.appended[kind.index()].push(sample.pts);
        if state.replacing[kind.index()] {
            Ok(AppendOutcome::Replaced)
        } else {
            Ok(AppendOutcome::Queued)
        }
    }

    fn mark_as_finished(&mut self, kind: MediaKind) {
        let mut state = self.probe.state.lock();
        if !state.marked_finished.contains(&kind) {
            state.marked_finished.push(kind);
        }
    }

    fn finish_writing(self: Box<Self>) -> RecordingResult<FinishedWriting> {
        let mut state = self.probe.state.lock();
        let error = match state.status {
            WriterStatus::Writing => None,
            // Keeps what was appended before the failure
            WriterStatus::Failed => Some(state.error.clone().unwrap_or_default()),
            WriterStatus::Unknown => {
                state.status = WriterStatus::Failed;
                return Err(RecordingError::Writer("no samples were written".to_string()));
            }
            WriterStatus::Finished => {
                return Err(RecordingError::Writer("already finished".to_string()));
            }
        };

        let video_samples = state.appended[MediaKind::Video.index()].len() as u64;
        let audio_samples = state.appended[MediaKind::Audio.index()].len() as u64;
        std::fs::write(
            &self.path,
            format!("video={} audio={}\n", video_samples, audio_samples),
        )?;

        if error.is_none() {
            state.status = WriterStatus::Finished;
        }
        state.finished = true;
        Ok(FinishedWriting {
            path: self.path.clone(),
            video_samples,
            audio_samples,
            error,
        })
    }
}

/// Factory handing out `FakeWriter`s and keeping a probe to each
#[derive(Clone, Default)]
pub struct FakeWriterFactory {
    writers: Arc<Mutex<Vec<WriterProbe>>>,
    refused_tracks: Arc<Mutex<Vec<MediaKind>>>,
    create_error: Arc<Mutex<Option<String>>>,
}

impl FakeWriterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse_track(&self, kind: MediaKind) {
        self.refused_tracks.lock().push(kind);
    }

    /// Make the next `create_writer` fail
    pub fn fail_create(&self, message: &str) {
        *self.create_error.lock() = Some(message.to_string());
    }

    pub fn last_writer(&self) -> Option<WriterProbe> {
        self.writers.lock().last().cloned()
    }

    pub fn writers_created(&self) -> usize {
        self.writers.lock().len()
    }
}

impl WriterFactory for FakeWriterFactory {
    fn create_writer(&self, output_path: &Path) -> RecordingResult<Box<dyn AssetWriter>> {
        if let Some(message) = self.create_error.lock().take() {
            return Err(RecordingError::Writer(message));
        }
        let writer = FakeWriter::new(output_path);
        let probe = writer.probe();
        probe.state.lock().refused_tracks = self.refused_tracks.lock().clone();
        self.writers.lock().push(probe);
        Ok(Box::new(writer))
    }
}
