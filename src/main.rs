use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use screen_recorder_lib::capture::{self, FfmpegCaptureSession};
use screen_recorder_lib::config::{RecorderConfig, VideoCodec};
use screen_recorder_lib::recorder::{CaptureController, RecordingEvent};
use screen_recorder_lib::writer::FfmpegWriterFactory;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::oneshot;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record the primary display and default microphone
    Record(RecordArgs),
    /// Show the display and microphone a recording would use
    Devices,
}

#[derive(Args, Debug)]
struct RecordArgs {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the recording is written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Encode width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Encode height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Average video bitrate in bits per second
    #[arg(long)]
    bitrate: Option<u32>,

    /// Video codec (h264 or hevc)
    #[arg(long)]
    codec: Option<VideoCodec>,

    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Stop automatically after this many seconds
    #[arg(short, long)]
    duration: Option<u64>,
}

impl RecordArgs {
    fn to_config(&self) -> Result<RecorderConfig> {
        let mut config = match &self.config {
            Some(path) => RecorderConfig::load(path)
                .with_context(|| format!("Failed to load config {:?}", path))?,
            None => RecorderConfig::default(),
        };

        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(width) = self.width {
            config.video.width = width;
        }
        if let Some(height) = self.height {
            config.video.height = height;
        }
        if let Some(bitrate) = self.bitrate {
            config.video.average_bitrate = bitrate;
        }
        if let Some(codec) = self.codec {
            config.video.codec = codec;
        }
        if let Some(fps) = self.fps {
            config.video.frame_rate = fps;
        }

        config.validate().context("Invalid recorder settings")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    screen_recorder_lib::init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Record(args) => record(args).await,
        Commands::Devices => {
            devices();
            Ok(())
        }
    }
}

async fn record(args: RecordArgs) -> Result<()> {
    let config = args.to_config()?;
    tracing::info!("Starting screen-recorder v{}", env!("CARGO_PKG_VERSION"));

    let controller = CaptureController::new(
        config,
        Box::new(FfmpegCaptureSession::new()),
        Box::new(FfmpegWriterFactory::new()),
    )
    .context("Failed to create capture controller")?;

    let mut events = controller.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!("Missed {} recording events", missed)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let path = controller.start().await.context("Failed to start recording")?;
    println!("Recording to {}", path.display());
    match args.duration {
        Some(secs) => println!("Stopping after {}s (Enter or Ctrl-C stops early)", secs),
        None => println!("Press Enter or Ctrl-C to stop"),
    }

    wait_for_stop(args.duration.map(Duration::from_secs)).await;

    let output = controller
        .stop()
        .await
        .context("Failed to finalize recording")?;

    println!(
        "Saved {} ({:.1}s, {} video / {} audio samples)",
        output.path.display(),
        output.session.duration_ms / 1000.0,
        output.video_samples,
        output.audio_samples
    );
    if let Some(error) = &output.writer_error {
        println!("Recording is incomplete: {}", error);
    }
    let stats = output.stats;
    if stats.video.dropped_by_capture + stats.video.dropped_not_ready + stats.video.dropped_replaced > 0 {
        println!(
            "Dropped video frames: {} by capture, {} not ready, {} replaced",
            stats.video.dropped_by_capture, stats.video.dropped_not_ready, stats.video.dropped_replaced
        );
    }
    if stats.audio.dropped_by_capture + stats.audio.dropped_not_ready > 0 {
        println!(
            "Dropped audio chunks: {} by capture, {} not ready",
            stats.audio.dropped_by_capture, stats.audio.dropped_not_ready
        );
    }
    Ok(())
}

/// Resolve on Ctrl-C, Enter, or after `limit`
async fn wait_for_stop(limit: Option<Duration>) {
    // A pending stdin read must not hold up exit, so it runs on a plain thread
    let (enter_tx, enter_rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        if matches!(std::io::stdin().read_line(&mut line), Ok(n) if n > 0) {
            let _ = enter_tx.send(());
        }
    });
    let timeout = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, stopping"),
        Ok(()) = enter_rx => {}
        _ = timeout => tracing::info!("Duration reached, stopping"),
    }
}

fn log_event(event: &RecordingEvent) {
    match event {
        RecordingEvent::Started { path } => tracing::debug!("Started: {:?}", path),
        RecordingEvent::SessionStarted { at } => tracing::debug!("First sample at {}", at),
        RecordingEvent::Stopped { output } => tracing::debug!("Stopped: {:?}", output.path),
        RecordingEvent::FrameDropped { kind, reason } => {
            tracing::debug!("Dropped {} sample ({:?})", kind, reason)
        }
        RecordingEvent::WriterFailed { error } => tracing::warn!("Writer failed: {}", error),
        RecordingEvent::Error(message) => tracing::error!("{}", message),
    }
}

fn devices() {
    let displays = capture::get_displays();
    if displays.is_empty() {
        println!("Displays: none found");
    }
    for display in displays {
        println!(
            "Display {}: {} {}x{} (scale {:.1}){}",
            display.id,
            display.name,
            display.width,
            display.height,
            display.scale_factor,
            if display.is_primary { " [primary]" } else { "" }
        );
    }

    match capture::default_microphone() {
        Some(mic) => println!("Microphone: {} [default]", mic.name),
        None => println!("Microphone: none found"),
    }
}
