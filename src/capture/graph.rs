//! Capture graph configuration
//!
//! Wires one screen input and one microphone input to a video sink and an audio
//! sink inside a single configuration transaction. Any failure aborts the
//! transaction; the session is never committed with only one stream.

use super::traits::{
    AudioDeviceInfo, CaptureInput, CaptureOutput, CaptureSession, DisplayInfo, SampleDelegate,
    VideoOutputSettings,
};
use crate::config::RecorderConfig;
use crate::recorder::error::{RecordingError, RecordingResult};
use std::sync::Arc;

/// Devices the committed graph captures from
#[derive(Debug, Clone)]
pub struct ConfiguredGraph {
    pub display: DisplayInfo,
    pub microphone: AudioDeviceInfo,
}

/// Configure `session` for screen + microphone capture delivering to `delegate`
pub fn configure_capture_graph(
    session: &mut dyn CaptureSession,
    config: &RecorderConfig,
    delegate: Arc<dyn SampleDelegate>,
) -> RecordingResult<ConfiguredGraph> {
    session.begin_configuration();

    let graph = match wire_graph(session, config, delegate) {
        Ok(graph) => graph,
        Err(e) => {
            tracing::error!("Capture graph configuration failed: {}", e);
            session.abort_configuration();
            return Err(e);
        }
    };

    session.commit_configuration()?;

    tracing::info!(
        "Capture graph committed: display {} ({}x{}), microphone '{}'",
        graph.display.id,
        graph.display.width,
        graph.display.height,
        graph.microphone.name
    );
    Ok(graph)
}

fn wire_graph(
    session: &mut dyn CaptureSession,
    config: &RecorderConfig,
    delegate: Arc<dyn SampleDelegate>,
) -> RecordingResult<ConfiguredGraph> {
    // Graphs from earlier recordings are replaced, not extended
    session.remove_all();

    let display = session
        .primary_display()
        .ok_or(RecordingError::DisplayNotFound)?;
    let microphone = session
        .default_audio_input()
        .ok_or(RecordingError::AudioDeviceNotFound)?;

    let video_output = CaptureOutput::Video(VideoOutputSettings {
        width: display.width,
        height: display.height,
        frame_rate: config.video.frame_rate,
        discards_late_frames: config.discards_late_video_frames,
    });

    for output in [video_output, CaptureOutput::Audio] {
        if !session.can_add_output(&output) {
            return Err(RecordingError::CannotAddOutput(format!("{} sink", output.kind())));
        }
        session.add_output(output);
    }

    let inputs = [
        CaptureInput::Screen(display.clone()),
        CaptureInput::Microphone(microphone.clone()),
    ];
    for input in inputs {
        if !session.can_add_input(&input) {
            let description = match &input {
                CaptureInput::Screen(d) => format!("screen '{}'", d.name),
                CaptureInput::Microphone(m) => format!("microphone '{}'", m.name),
            };
            return Err(RecordingError::CannotAddInput(description));
        }
        session.add_input(input);
    }

    session.set_sample_delegate(delegate);

    Ok(ConfiguredGraph {
        display,
        microphone,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::sample::MediaKind;
    use crate::testing::{FakeCaptureSession, NullDelegate};

    fn delegate() -> Arc<dyn SampleDelegate> {
        Arc::new(NullDelegate)
    }

    #[test]
    fn test_configures_both_streams() {
        let mut session = FakeCaptureSession::new();
        let probe = session.probe();
        let graph = configure_capture_graph(&mut session, &RecorderConfig::default(), delegate()).unwrap();

        assert_eq!(graph.display.width, 2880);
        assert!(probe.committed());
        assert_eq!(probe.input_kinds(), vec![MediaKind::Video, MediaKind::Audio]);

        let outputs = probe.outputs();
        assert_eq!(outputs.len(), 2);
        match &outputs[0] {
            CaptureOutput::Video(settings) => {
                assert_eq!((settings.width, settings.height), (2880, 1800));
                assert!(!settings.discards_late_frames);
            }
            other => panic!("unexpected output {:?}", other),
        }
        assert!(probe.has_delegate());
    }

    #[test]
    fn test_missing_display_aborts() {
        let mut session = FakeCaptureSession::new().without_display();
        let probe = session.probe();
        let result = configure_capture_graph(&mut session, &RecorderConfig::default(), delegate());

        assert!(matches!(result, Err(RecordingError::DisplayNotFound)));
        assert!(!probe.committed());
        assert!(probe.outputs().is_empty());
    }

    #[test]
    fn test_missing_microphone_is_distinct_error() {
        let mut session = FakeCaptureSession::new().without_microphone();
        let result = configure_capture_graph(&mut session, &RecorderConfig::default(), delegate());
        let err = result.unwrap_err();
        assert!(matches!(err, RecordingError::AudioDeviceNotFound));
        assert!(err.is_device_resolution());
    }

    #[test]
    fn test_refused_input_fails_loudly() {
        let mut session = FakeCaptureSession::new().refusing_input(MediaKind::Audio);
        let probe = session.probe();
        let result = configure_capture_graph(&mut session, &RecorderConfig::default(), delegate());

        assert!(matches!(result, Err(RecordingError::CannotAddInput(_))));
        assert!(!probe.committed());
        assert!(probe.input_kinds().is_empty());
    }

    #[test]
    fn test_refused_output_fails_loudly() {
        let mut session = FakeCaptureSession::new().refusing_output(MediaKind::Video);
        let result = configure_capture_graph(&mut session, &RecorderConfig::default(), delegate());
        assert!(matches!(result, Err(RecordingError::CannotAddOutput(_))));
    }

    #[test]
    fn test_reconfiguring_replaces_graph() {
        let mut session = FakeCaptureSession::new();
        let probe = session.probe();
        let config = RecorderConfig::default();
        configure_capture_graph(&mut session, &config, delegate()).unwrap();
        configure_capture_graph(&mut session, &config, delegate()).unwrap();
        assert_eq!(probe.input_kinds().len(), 2);
        assert_eq!(probe.outputs().len(), 2);
    }
}
