//! Capture session controller
//!
//! The collaborator-facing entry point. `start()`, `stop()` and
//! `is_recording()` only flip the recording flag and enqueue commands; all
//! session configuration, writer setup and sample routing happens on one
//! dedicated processing thread, in the order the commands were enqueued.

use super::error::{RecordingError, RecordingResult};
use super::events::{CaptureStats, DropReason, RecordingEvent, StatsSnapshot};
use super::flag::{RecordingFlag, StartTicket};
use super::naming::next_output_path;
use super::routing::{route_sample, RouteOutcome};
use super::state::{ActiveRecording, RecordingOutput};
use crate::capture::graph::configure_capture_graph;
use crate::capture::sample::{MediaKind, SampleBuffer};
use crate::capture::traits::{CaptureSession, SampleDelegate};
use crate::config::RecorderConfig;
use crate::writer::{setup_writer, WriterFactory};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::JoinHandle;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Appended samples between progress log lines
const LOG_EVERY: u64 = 300;

/// Completion signal of an asynchronous controller operation
///
/// Await it from async code or call `wait()` from a plain thread. `wait()`
/// must not be called from inside an async runtime.
#[must_use = "the operation's result is only observable through its completion"]
pub struct Completion<T> {
    rx: oneshot::Receiver<RecordingResult<T>>,
}

impl<T> Completion<T> {
    fn channel() -> (oneshot::Sender<RecordingResult<T>>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    fn ready(result: RecordingResult<T>) -> Self {
        let (tx, completion) = Self::channel();
        let _ = tx.send(result);
        completion
    }

    /// Block until the operation completes
    pub fn wait(self) -> RecordingResult<T> {
        self.rx
            .blocking_recv()
            .unwrap_or(Err(RecordingError::ControllerClosed))
    }
}

impl<T> Future for Completion<T> {
    type Output = RecordingResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(RecordingError::ControllerClosed)))
    }
}

enum Command {
    Start {
        ticket: StartTicket,
        reply: oneshot::Sender<RecordingResult<PathBuf>>,
    },
    Stop {
        reply: oneshot::Sender<RecordingResult<RecordingOutput>>,
    },
    Sample {
        generation: u64,
        sample: SampleBuffer,
    },
    Dropped {
        generation: u64,
        kind: MediaKind,
    },
    Shutdown,
}

/// Hands samples from capture threads to the processing queue
///
/// Each start attempt registers a fresh delegate stamped with its own
/// generation, so capture threads of an earlier recording that are still
/// winding down cannot feed the next one.
struct QueueDelegate {
    commands: mpsc::UnboundedSender<Command>,
    backlog: Arc<AtomicUsize>,
    generation: u64,
}

impl SampleDelegate for QueueDelegate {
    fn did_output(&self, sample: SampleBuffer) {
        self.backlog.fetch_add(1, Ordering::Relaxed);
        let command = Command::Sample {
            generation: self.generation,
            sample,
        };
        if self.commands.send(command).is_err() {
            self.backlog.fetch_sub(1, Ordering::Relaxed);
        }
    }

    fn did_drop(&self, kind: MediaKind) {
        let _ = self.commands.send(Command::Dropped {
            generation: self.generation,
            kind,
        });
    }

    fn backlog(&self) -> usize {
        self.backlog.load(Ordering::Relaxed)
    }
}

/// Records the screen and microphone into one container file per recording
pub struct CaptureController {
    flag: Arc<RecordingFlag>,
    commands: mpsc::UnboundedSender<Command>,
    event_tx: broadcast::Sender<RecordingEvent>,
    stats: Arc<CaptureStats>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureController {
    /// Create a controller and its processing thread
    pub fn new(
        config: RecorderConfig,
        session: Box<dyn CaptureSession>,
        writers: Box<dyn WriterFactory>,
    ) -> RecordingResult<Self> {
        let (commands, rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(100);
        let flag = Arc::new(RecordingFlag::new());
        let stats = Arc::new(CaptureStats::new());
        let backlog = Arc::new(AtomicUsize::new(0));

        let worker = Worker {
            config,
            session,
            writers,
            commands: commands.clone(),
            backlog,
            generation: 0,
            flag: flag.clone(),
            event_tx: event_tx.clone(),
            stats: stats.clone(),
            active: None,
            finalizers: Vec::new(),
        };

        let handle = std::thread::Builder::new()
            .name("capture-session".to_string())
            .spawn(move || worker.run(rx))?;

        Ok(Self {
            flag,
            commands,
            event_tx,
            stats,
            worker: Some(handle),
        })
    }

    /// Begin a new recording
    ///
    /// The recording flag is set before this returns. The completion resolves
    /// with the output path once capture is running, or with the setup error,
    /// in which case the flag has been rolled back. Calling `start()` while
    /// recording resolves immediately with `AlreadyRecording` and changes
    /// nothing.
    pub fn start(&self) -> Completion<PathBuf> {
        let Some(ticket) = self.flag.try_start() else {
            tracing::debug!("Ignoring start: already recording");
            return Completion::ready(Err(RecordingError::AlreadyRecording));
        };

        let (reply, completion) = Completion::channel();
        if self.commands.send(Command::Start { ticket, reply }).is_err() {
            self.flag.rollback(ticket);
        }
        completion
    }

    /// End the current recording
    ///
    /// The recording flag is cleared before this returns. The completion
    /// resolves once the container file is finalized. Calling `stop()` when
    /// not recording resolves immediately with `NotRecording` and changes
    /// nothing.
    pub fn stop(&self) -> Completion<RecordingOutput> {
        if !self.flag.try_stop() {
            tracing::debug!("Ignoring stop: not recording");
            return Completion::ready(Err(RecordingError::NotRecording));
        }

        let (reply, completion) = Completion::channel();
        let _ = self.commands.send(Command::Stop { reply });
        completion
    }

    pub fn is_recording(&self) -> bool {
        self.flag.is_recording()
    }

    /// Subscribe to recording events
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.event_tx.subscribe()
    }

    /// Counters of the current (or last) recording
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::error!("Capture session thread panicked");
            }
        }
    }
}

/// State owned by the processing thread
struct Worker {
    config: RecorderConfig,
    session: Box<dyn CaptureSession>,
    writers: Box<dyn WriterFactory>,
    commands: mpsc::UnboundedSender<Command>,
    backlog: Arc<AtomicUsize>,
    /// Start attempt whose samples are routed
    generation: u64,
    flag: Arc<RecordingFlag>,
    event_tx: broadcast::Sender<RecordingEvent>,
    stats: Arc<CaptureStats>,
    active: Option<ActiveRecording>,
    finalizers: Vec<JoinHandle<()>>,
}

impl Worker {
    fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        tracing::debug!("Capture session thread started");

        while let Some(command) = rx.blocking_recv() {
            match command {
                Command::Start { ticket, reply } => {
                    let result = self.start_recording();
                    if let Err(e) = &result {
                        tracing::error!("Failed to start recording: {}", e);
                        self.flag.rollback(ticket);
                        self.emit(RecordingEvent::Error(e.to_string()));
                    }
                    let _ = reply.send(result);
                }
                Command::Stop { reply } => self.stop_recording(reply),
                Command::Sample { generation, sample } => {
                    self.backlog.fetch_sub(1, Ordering::Relaxed);
                    if generation == self.generation {
                        self.route(sample);
                    } else {
                        tracing::trace!("Ignoring {} sample from an earlier recording", sample.kind());
                    }
                }
                Command::Dropped { generation, kind } => {
                    if generation == self.generation && self.active.is_some() {
                        self.stats.record_dropped(kind, DropReason::Capture);
                        self.emit(RecordingEvent::FrameDropped {
                            kind,
                            reason: DropReason::Capture,
                        });
                    }
                }
                Command::Shutdown => break,
            }
        }

        self.shutdown();
        tracing::debug!("Capture session thread stopped");
    }

    fn start_recording(&mut self) -> RecordingResult<PathBuf> {
        if self.active.is_some() {
            return Err(RecordingError::AlreadyRecording);
        }

        self.stats.reset();
        self.generation += 1;
        let output_path = next_output_path(&self.config.output_dir, self.config.container)?;

        let delegate = Arc::new(QueueDelegate {
            commands: self.commands.clone(),
            backlog: self.backlog.clone(),
            generation: self.generation,
        });
        let graph = configure_capture_graph(self.session.as_mut(), &self.config, delegate)?;
        let writer = setup_writer(
            self.writers.as_ref(),
            &output_path,
            &self.config,
            &graph.display,
        )?;
        self.session.start_running()?;

        self.active = Some(ActiveRecording::new(writer));
        tracing::info!("Recording started: {:?}", output_path);
        self.emit(RecordingEvent::Started {
            path: output_path.clone(),
        });
        Ok(output_path)
    }

    fn stop_recording(&mut self, reply: oneshot::Sender<RecordingResult<RecordingOutput>>) {
        let Some(active) = self.take_active() else {
            let _ = reply.send(Err(RecordingError::NotRecording));
            return;
        };

        let stats = self.stats.clone();
        let event_tx = self.event_tx.clone();
        let spawned = std::thread::Builder::new()
            .name("finalize".to_string())
            .spawn(move || {
                let result = finalize(active, &stats, &event_tx);
                let _ = reply.send(result);
            });

        match spawned {
            Ok(handle) => {
                self.finalizers.retain(|h| !h.is_finished());
                self.finalizers.push(handle);
            }
            Err(e) => {
                tracing::error!("Failed to spawn finalize thread: {}", e);
                self.emit(RecordingEvent::Error(format!(
                    "Failed to finalize recording: {}",
                    e
                )));
            }
        }
    }

    /// Close both tracks and stop capture, handing back the writer bundle
    fn take_active(&mut self) -> Option<ActiveRecording> {
        let mut active = self.active.take()?;
        for kind in MediaKind::ALL {
            active.writer.mark_as_finished(kind);
        }
        self.session.stop_running();
        Some(active)
    }

    fn route(&mut self, sample: SampleBuffer) {
        match route_sample(self.active.as_mut(), sample) {
            RouteOutcome::NoWriter | RouteOutcome::WriterClosed => {}
            RouteOutcome::SessionStarted(at) => {
                tracing::info!("Writer session started at {}", at);
                self.emit(RecordingEvent::SessionStarted { at });
            }
            RouteOutcome::Appended(kind) => self.record_appended(kind),
            RouteOutcome::Replaced(kind) => {
                self.record_appended(kind);
                self.stats.record_dropped(kind, DropReason::Replaced);
                self.emit(RecordingEvent::FrameDropped {
                    kind,
                    reason: DropReason::Replaced,
                });
            }
            RouteOutcome::NotReady(kind) => {
                self.stats.record_dropped(kind, DropReason::NotReady);
                self.emit(RecordingEvent::FrameDropped {
                    kind,
                    reason: DropReason::NotReady,
                });
            }
            RouteOutcome::WriterFailed(error) => {
                tracing::warn!("Dropping sample, writer failed: {}", error);
                self.stats.record_writer_error();
                self.emit(RecordingEvent::WriterFailed { error });
            }
        }
    }

    fn record_appended(&self, kind: MediaKind) {
        self.stats.record_appended(kind);
        let appended = self.stats.appended(kind);
        if appended % LOG_EVERY == 0 {
            tracing::debug!("Appended {} {} samples", appended, kind);
        }
    }

    fn shutdown(&mut self) {
        if let Some(active) = self.take_active() {
            tracing::info!("Finalizing recording in progress before shutdown");
            self.flag.try_stop();
            let _ = finalize(active, &self.stats, &self.event_tx);
        }
        if self.session.is_running() {
            self.session.stop_running();
        }
        for handle in self.finalizers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("Finalize thread panicked");
            }
        }
    }

    fn emit(&self, event: RecordingEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// Finish the container file and write its sidecar metadata
fn finalize(
    active: ActiveRecording,
    stats: &CaptureStats,
    event_tx: &broadcast::Sender<RecordingEvent>,
) -> RecordingResult<RecordingOutput> {
    let ActiveRecording {
        writer,
        mut session,
        session_start,
        started_at,
        ..
    } = active;
    session.end(started_at.elapsed().as_secs_f64() * 1000.0);

    let finished = match writer.finish_writing() {
        Ok(finished) => finished,
        Err(e) => {
            tracing::error!("Failed to finalize recording: {}", e);
            let _ = event_tx.send(RecordingEvent::Error(e.to_string()));
            return Err(e);
        }
    };

    let output = RecordingOutput {
        path: finished.path,
        session,
        session_start,
        video_samples: finished.video_samples,
        audio_samples: finished.audio_samples,
        stats: stats.snapshot(),
        writer_error: finished.error,
    };
    if let Err(e) = output.write_sidecar() {
        tracing::warn!("Failed to write recording metadata: {}", e);
    }

    match &output.writer_error {
        Some(error) => tracing::warn!(
            "Recording stopped incomplete: {:?} ({:.1}s): {}",
            output.path,
            output.session.duration_ms / 1000.0,
            error
        ),
        None => tracing::info!(
            "Recording stopped: {:?} ({:.1}s)",
            output.path,
            output.session.duration_ms / 1000.0
        ),
    }
    let _ = event_tx.send(RecordingEvent::Stopped {
        output: output.clone(),
    });
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::sample::MediaTime;
    use crate::testing::{audio_sample, video_sample, FakeCaptureSession, FakeWriterFactory};
    use crate::writer::WriterStatus;
    use std::path::Path;
    use tempfile::tempdir;

    fn controller(
        dir: &Path,
        session: FakeCaptureSession,
        factory: &FakeWriterFactory,
    ) -> CaptureController {
        let config = RecorderConfig {
            output_dir: dir.to_path_buf(),
            ..RecorderConfig::default()
        };
        CaptureController::new(config, Box::new(session), Box::new(factory.clone())).unwrap()
    }

    fn files_with_extension(dir: &Path, extension: &str) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some(extension))
            .count()
    }

    fn drain(rx: &mut broadcast::Receiver<RecordingEvent>) -> Vec<RecordingEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_flag_follows_latest_call() {
        let dir = tempdir().unwrap();
        let factory = FakeWriterFactory::new();
        let controller = controller(dir.path(), FakeCaptureSession::new(), &factory);

        assert!(!controller.is_recording());
        let started = controller.start();
        assert!(controller.is_recording());
        let stopped = controller.stop();
        assert!(!controller.is_recording());

        assert!(started.wait().is_ok());
        // No sample ever reached the writer, so there is nothing to finalize
        assert!(matches!(stopped.wait(), Err(RecordingError::Writer(_))));
        assert!(!controller.is_recording());
    }

    #[test]
    fn test_stop_before_start_is_safe() {
        let dir = tempdir().unwrap();
        let factory = FakeWriterFactory::new();
        let session = FakeCaptureSession::new();
        let probe = session.probe();
        let controller = controller(dir.path(), session, &factory);

        assert!(matches!(controller.stop().wait(), Err(RecordingError::NotRecording)));
        assert!(!controller.is_recording());
        assert_eq!(probe.stop_count(), 0);

        // Controller is still usable
        assert!(controller.start().wait().is_ok());
        assert!(controller.is_recording());
    }

    #[test]
    fn test_round_trip_consumes_only_first_sample() {
        let dir = tempdir().unwrap();
        let factory = FakeWriterFactory::new();
        let session = FakeCaptureSession::new();
        let probe = session.probe();
        let controller = controller(dir.path(), session, &factory);

        let path = controller.start().wait().unwrap();
        assert!(probe.is_running());

        // 5 video, 4 audio, interleaved with increasing timestamps
        for i in 0..5u64 {
            probe.emit(video_sample(i * 33));
            if i < 4 {
                probe.emit(audio_sample(i * 33 + 10));
            }
        }

        let output = controller.stop().wait().unwrap();
        assert_eq!(output.path, path);
        assert_eq!(output.video_samples, 4);
        assert_eq!(output.audio_samples, 4);
        assert_eq!(output.session_start, Some(MediaTime::ZERO));
        assert_eq!(output.stats.video.appended, 4);
        assert_eq!(output.stats.audio.appended, 4);
        assert!(path.exists());
        assert!(output.sidecar_path().exists());

        let writer = factory.last_writer().unwrap();
        assert!(writer.finished());
        assert_eq!(writer.marked_finished(), vec![MediaKind::Video, MediaKind::Audio]);
        assert!(!probe.is_running());
    }

    #[test]
    fn test_missing_display_fails_start_without_file() {
        let dir = tempdir().unwrap();
        let factory = FakeWriterFactory::new();
        let controller = controller(
            dir.path(),
            FakeCaptureSession::new().without_display(),
            &factory,
        );

        let result = controller.start().wait();
        let err = result.unwrap_err();
        assert!(err.is_device_resolution());
        assert!(matches!(err, RecordingError::DisplayNotFound));
        assert!(!controller.is_recording());
        assert_eq!(factory.writers_created(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_microphone_fails_start() {
        let dir = tempdir().unwrap();
        let factory = FakeWriterFactory::new();
        let controller = controller(
            dir.path(),
            FakeCaptureSession::new().without_microphone(),
            &factory,
        );
        let mut events = controller.subscribe();

        assert!(matches!(
            controller.start().wait(),
            Err(RecordingError::AudioDeviceNotFound)
        ));
        assert!(!controller.is_recording());
        assert!(drain(&mut events)
            .iter()
            .any(|e| matches!(e, RecordingEvent::Error(_))));
    }

    #[test]
    fn test_refused_track_fails_start() {
        let dir = tempdir().unwrap();
        let factory = FakeWriterFactory::new();
        factory.refuse_track(MediaKind::Video);
        let session = FakeCaptureSession::new();
        let probe = session.probe();
        let controller = controller(dir.path(), session, &factory);

        assert!(matches!(
            controller.start().wait(),
            Err(RecordingError::CannotAddTrack(MediaKind::Video))
        ));
        assert!(!controller.is_recording());
        assert!(!probe.is_running());
    }

    #[test]
    fn test_writer_creation_failure_rolls_back() {
        let dir = tempdir().unwrap();
        let factory = FakeWriterFactory::new();
        factory.fail_create("read-only volume");
        let session = FakeCaptureSession::new();
        let probe = session.probe();
        let controller = controller(dir.path(), session, &factory);

        assert!(matches!(controller.start().wait(), Err(RecordingError::Writer(_))));
        assert!(!controller.is_recording());
        assert!(!probe.is_running());
        assert_eq!(files_with_extension(dir.path(), "mov"), 0);
    }

    #[test]
    fn test_session_start_failure_rolls_back() {
        let dir = tempdir().unwrap();
        let factory = FakeWriterFactory::new();
        let session = FakeCaptureSession::new();
        let probe = session.probe();
        probe.fail_start("screen capture not permitted");
        let controller = controller(dir.path(), session, &factory);

        assert!(matches!(controller.start().wait(), Err(RecordingError::Capture(_))));
        assert!(!controller.is_recording());

        // The next attempt starts cleanly
        assert!(controller.start().wait().is_ok());
    }

    #[test]
    fn test_rapid_starts_create_one_file() {
        let dir = tempdir().unwrap();
        let factory = FakeWriterFactory::new();
        let session = FakeCaptureSession::new();
        let probe = session.probe();
        let controller = controller(dir.path(), session, &factory);

        let first = controller.start();
        let second = controller.start();
        assert!(matches!(second.wait(), Err(RecordingError::AlreadyRecording)));
        assert!(first.wait().is_ok());

        probe.emit(video_sample(0));
        probe.emit(video_sample(33));
        controller.stop().wait().unwrap();

        assert_eq!(factory.writers_created(), 1);
        assert_eq!(probe.start_count(), 1);
        assert_eq!(files_with_extension(dir.path(), "mov"), 1);
    }

    #[test]
    fn test_failed_writer_reports_every_sample() {
        let dir = tempdir().unwrap();
        let factory = FakeWriterFactory::new();
        let session = FakeCaptureSession::new();
        let probe = session.probe();
        let controller = controller(dir.path(), session, &factory);
        let mut events = controller.subscribe();

        controller.start().wait().unwrap();
        probe.emit(video_sample(0));
        probe.emit(video_sample(33));
        // Synchronise with the queue before breaking the writer
        let appended_before = {
            let writer = factory.last_writer().unwrap();
            while writer.appended(MediaKind::Video).is_empty() {
                std::thread::yield_now();
            }
            writer.fail("disk full");
            writer.appended(MediaKind::Video).len()
        };

        probe.emit(video_sample(66));
        probe.emit(audio_sample(70));
        probe.emit(video_sample(99));

        // Finalize still keeps what was written before the failure
        let output = controller.stop().wait().unwrap();
        assert!(!controller.is_recording());
        assert!(output.path.exists());
        assert_eq!(output.writer_error.as_deref(), Some("disk full"));
        assert_eq!(output.video_samples, appended_before as u64);
        assert_eq!(output.stats.writer_errors, 3);

        let sidecar = RecordingOutput::read_sidecar(&output.sidecar_path()).unwrap();
        assert_eq!(sidecar.writer_error.as_deref(), Some("disk full"));

        let writer = factory.last_writer().unwrap();
        assert!(writer.finished());
        assert_eq!(writer.status(), WriterStatus::Failed);
        assert_eq!(writer.appended(MediaKind::Video).len(), appended_before);

        let failures = drain(&mut events)
            .into_iter()
            .filter(|e| matches!(e, RecordingEvent::WriterFailed { .. }))
            .count();
        assert_eq!(failures, 3);
    }

    #[test]
    fn test_not_ready_samples_are_dropped_and_counted() {
        let dir = tempdir().unwrap();
        let factory = FakeWriterFactory::new();
        let session = FakeCaptureSession::new();
        let probe = session.probe();
        let controller = controller(dir.path(), session, &factory);

        controller.start().wait().unwrap();
        factory.last_writer().unwrap().set_ready(MediaKind::Audio, false);
        probe.emit(video_sample(0));
        probe.emit(audio_sample(10));
        probe.emit(video_sample(33));
        probe.emit(audio_sample(20));

        let output = controller.stop().wait().unwrap();
        assert_eq!(output.video_samples, 1);
        assert_eq!(output.audio_samples, 0);
        assert_eq!(output.stats.audio.dropped_not_ready, 2);
    }

    #[test]
    fn test_replaced_samples_count_as_drops() {
        let dir = tempdir().unwrap();
        let factory = FakeWriterFactory::new();
        let session = FakeCaptureSession::new();
        let probe = session.probe();
        let controller = controller(dir.path(), session, &factory);
        let mut events = controller.subscribe();

        controller.start().wait().unwrap();
        probe.emit(video_sample(0));
        probe.emit(video_sample(33));
        let writer = factory.last_writer().unwrap();
        while writer.appended(MediaKind::Video).is_empty() {
            std::thread::yield_now();
        }
        writer.set_replacing(MediaKind::Video, true);
        probe.emit(video_sample(40));
        probe.emit(video_sample(45));

        let output = controller.stop().wait().unwrap();
        assert_eq!(output.stats.video.appended, 3);
        assert_eq!(output.stats.video.dropped_replaced, 2);
        assert_eq!(output.writer_error, None);

        let replaced = drain(&mut events)
            .into_iter()
            .filter(|e| {
                matches!(
                    e,
                    RecordingEvent::FrameDropped {
                        kind: MediaKind::Video,
                        reason: DropReason::Replaced
                    }
                )
            })
            .count();
        assert_eq!(replaced, 2);
    }

    #[test]
    fn test_capture_drops_are_counted() {
        let dir = tempdir().unwrap();
        let factory = FakeWriterFactory::new();
        let session = FakeCaptureSession::new();
        let probe = session.probe();
        let controller = controller(dir.path(), session, &factory);
        let mut events = controller.subscribe();

        controller.start().wait().unwrap();
        probe.emit(video_sample(0));
        probe.emit(video_sample(33));
        probe.emit_drop(MediaKind::Video);
        probe.emit_drop(MediaKind::Video);

        let output = controller.stop().wait().unwrap();
        assert_eq!(output.stats.video.dropped_by_capture, 2);

        let dropped = drain(&mut events)
            .into_iter()
            .filter(|e| {
                matches!(
                    e,
                    RecordingEvent::FrameDropped {
                        kind: MediaKind::Video,
                        reason: DropReason::Capture
                    }
                )
            })
            .count();
        assert_eq!(dropped, 2);
    }

    #[test]
    fn test_samples_after_stop_are_ignored() {
        let dir = tempdir().unwrap();
        let factory = FakeWriterFactory::new();
        let session = FakeCaptureSession::new();
        let probe = session.probe();
        let controller = controller(dir.path(), session, &factory);

        controller.start().wait().unwrap();
        probe.emit(audio_sample(0));
        probe.emit(audio_sample(10));
        let stopped = controller.stop();
        probe.emit(audio_sample(20));

        let output = stopped.wait().unwrap();
        assert_eq!(output.audio_samples, 1);
    }

    #[test]
    fn test_each_recording_gets_a_fresh_writer() {
        let dir = tempdir().unwrap();
        let factory = FakeWriterFactory::new();
        let session = FakeCaptureSession::new();
        let probe = session.probe();
        let controller = controller(dir.path(), session, &factory);

        let mut paths = Vec::new();
        for _ in 0..2 {
            paths.push(controller.start().wait().unwrap());
            probe.emit(video_sample(0));
            probe.emit(video_sample(33));
            controller.stop().wait().unwrap();
        }

        assert_ne!(paths[0], paths[1]);
        assert_eq!(factory.writers_created(), 2);
        assert_eq!(files_with_extension(dir.path(), "mov"), 2);
        assert_eq!(files_with_extension(dir.path(), "json"), 2);
    }

    #[test]
    fn test_late_samples_from_previous_recording_are_ignored() {
        let dir = tempdir().unwrap();
        let factory = FakeWriterFactory::new();
        let session = FakeCaptureSession::new();
        let probe = session.probe();
        let controller = controller(dir.path(), session, &factory);

        controller.start().wait().unwrap();
        probe.emit(video_sample(10_000));
        probe.emit(video_sample(10_033));
        let previous = probe.delegate().unwrap();

        let stopped = controller.stop();
        let started = controller.start();
        // The first recording's capture threads are still delivering
        previous.did_output(video_sample(10_066));
        started.wait().unwrap();
        previous.did_output(video_sample(10_100));
        previous.did_drop(MediaKind::Video);

        probe.emit(video_sample(0));
        probe.emit(video_sample(33));
        probe.emit(video_sample(66));

        let first = stopped.wait().unwrap();
        assert_eq!(first.session_start, Some(MediaTime::from_millis(10_000)));
        assert_eq!(first.video_samples, 1);

        let second = controller.stop().wait().unwrap();
        assert_eq!(second.session_start, Some(MediaTime::ZERO));
        assert_eq!(second.video_samples, 2);
        assert_eq!(second.stats.video.dropped_by_capture, 0);
        assert_eq!(
            factory.last_writer().unwrap().appended(MediaKind::Video),
            vec![MediaTime::from_millis(33), MediaTime::from_millis(66)]
        );
    }

    #[test]
    fn test_drop_finalizes_recording_in_progress() {
        let dir = tempdir().unwrap();
        let factory = FakeWriterFactory::new();
        let session = FakeCaptureSession::new();
        let probe = session.probe();

        {
            let controller = controller(dir.path(), session, &factory);
            controller.start().wait().unwrap();
            probe.emit(video_sample(0));
            probe.emit(video_sample(33));
        }

        assert!(factory.last_writer().unwrap().finished());
        assert!(!probe.is_running());
    }

    #[tokio::test]
    async fn test_completions_can_be_awaited() {
        let dir = tempdir().unwrap();
        let factory = FakeWriterFactory::new();
        let session = FakeCaptureSession::new();
        let probe = session.probe();
        let controller = controller(dir.path(), session, &factory);

        let path = controller.start().await.unwrap();
        probe.emit(audio_sample(0));
        probe.emit(audio_sample(10));
        let output = controller.stop().await.unwrap();
        assert_eq!(output.path, path);
        assert_eq!(output.audio_samples, 1);
    }
}
