//! Microphone capture using cpal
//!
//! The cpal stream lives on its own thread since `cpal::Stream` is not Send.
//! Every callback buffer becomes one audio sample stamped with the shared
//! capture clock.

use super::clock::CaptureClock;
use super::sample::{AudioChunk, SampleBuffer};
use super::session::RunningSource;
use super::traits::{AudioDeviceInfo, SampleDelegate};
use crate::recorder::error::{RecordingError, RecordingResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::oneshot;

/// Get the default audio input device
pub fn default_microphone() -> Option<AudioDeviceInfo> {
    let host = cpal::default_host();
    let device = host.default_input_device()?;
    let name = device.name().ok()?;
    Some(AudioDeviceInfo {
        id: name.clone(),
        name,
        is_default: true,
    })
}

/// Get an audio input device by name
fn input_device_by_name(name: &str) -> Option<Device> {
    let host = cpal::default_host();
    if let Ok(devices) = host.input_devices() {
        for device in devices {
            if device.name().ok().as_deref() == Some(name) {
                return Some(device);
            }
        }
    }
    None
}

/// A running cpal input stream
pub struct CpalMicrophone {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

/// Open `device` and deliver its audio to `delegate` until stopped
pub fn start_microphone(
    _ffmpeg: &str,
    device: &AudioDeviceInfo,
    clock: CaptureClock,
    delegate: Arc<dyn SampleDelegate>,
) -> RecordingResult<Box<dyn RunningSource>> {
    let running = Arc::new(AtomicBool::new(true));
    let (ready_tx, ready_rx) = oneshot::channel::<Result<(), String>>();

    let device_name = device.name.clone();
    let keep_running = running.clone();
    let handle = std::thread::Builder::new()
        .name("microphone".to_string())
        .spawn(move || {
            let stream = match open_stream(&device_name, clock, delegate) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(format!("Failed to start microphone stream: {}", e)));
                return;
            }
            let _ = ready_tx.send(Ok(()));
            tracing::info!("Microphone stream started: {}", device_name);

            while keep_running.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(50));
            }

            // Stream is dropped here, stopping capture
            drop(stream);
            tracing::info!("Microphone stream stopped");
        })?;

    let microphone = CpalMicrophone {
        running,
        handle: Some(handle),
    };
    match ready_rx.blocking_recv() {
        Ok(Ok(())) => Ok(Box::new(microphone)),
        Ok(Err(message)) => {
            Box::new(microphone).stop();
            Err(RecordingError::Capture(message))
        }
        Err(_) => {
            Box::new(microphone).stop();
            Err(RecordingError::Capture(
                "Microphone thread exited during startup".to_string(),
            ))
        }
    }
}

fn open_stream(
    device_name: &str,
    clock: CaptureClock,
    delegate: Arc<dyn SampleDelegate>,
) -> Result<Stream, String> {
    let device = input_device_by_name(device_name)
        .ok_or_else(|| format!("Audio device '{}' not found", device_name))?;
    let config = device
        .default_input_config()
        .map_err(|e| format!("Failed to get audio config: {}", e))?;

    let sample_format = config.sample_format();
    let stream_config: StreamConfig = config.into();
    tracing::info!(
        "Microphone stream config: format={:?}, sample_rate={}, channels={}",
        sample_format,
        stream_config.sample_rate.0,
        stream_config.channels
    );

    let stream = match sample_format {
        SampleFormat::F32 => build_stream(&device, &stream_config, |s: f32| s, clock, delegate),
        SampleFormat::I16 => build_stream(
            &device,
            &stream_config,
            |s: i16| s as f32 / i16::MAX as f32,
            clock,
            delegate,
        ),
        SampleFormat::U16 => build_stream(
            &device,
            &stream_config,
            |s: u16| (s as f32 / u16::MAX as f32) * 2.0 - 1.0,
            clock,
            delegate,
        ),
        other => return Err(format!("Unsupported microphone sample format: {:?}", other)),
    };
    stream.map_err(|e| format!("Failed to build audio stream: {}", e))
}

fn build_stream<T, F>(
    device: &Device,
    config: &StreamConfig,
    convert: F,
    clock: CaptureClock,
    delegate: Arc<dyn SampleDelegate>,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    F: Fn(T) -> f32 + Send + 'static,
{
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;
    let callbacks = AtomicU64::new(0);

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            if callbacks.fetch_add(1, Ordering::Relaxed) == 0 {
                tracing::info!("Microphone: first callback received");
            }
            let chunk = AudioChunk {
                sample_rate,
                channels,
                samples: data.iter().map(|&s| convert(s)).collect(),
            };
            let pts = clock.started_ago(chunk.duration());
            delegate.did_output(SampleBuffer::audio(pts, chunk));
        },
        |err| tracing::error!("Microphone stream error: {}", err),
        None,
    )
}

impl RunningSource for CpalMicrophone {
    fn name(&self) -> &str {
        "microphone"
    }

    fn stop(mut self: Box<Self>) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Microphone thread panicked");
            }
        }
    }
}
