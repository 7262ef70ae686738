//! Capture sender
//!
//! Captures frames from one or more cameras and uploads them to a relay.
//!
//! Run with:
//!   cargo run --bin capture_sender -- --server http://localhost:5000 --camera cam1 --camera cam2
//!
//! Each `--camera` gets its own capture loop, send queue and upload loop, fed
//! by a test pattern device numbered in order of appearance.

use std::time::{Duration, Instant};

use clap::Parser;
use frame_relay::client::{CaptureSender, HttpUploader, SenderConfig, TestPatternCamera};
use frame_relay::relay::CameraId;

#[derive(Parser, Debug)]
#[command(name = "capture_sender")]
#[command(about = "Capture camera frames and upload them to a frame relay", long_about = None)]
struct Args {
    /// Relay base URL
    #[arg(long, default_value = "http://localhost:5000", env = "FRAME_RELAY_SERVER")]
    server: String,

    /// Camera id to upload under (repeat for several cameras)
    #[arg(long = "camera", required = true)]
    cameras: Vec<CameraId>,

    /// Target capture rate
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// JPEG quality (1-100); lower uses less bandwidth
    #[arg(long, default_value_t = 70)]
    quality: u8,

    /// Scale frames before encoding (1.0 = native size)
    #[arg(long, default_value_t = 1.0)]
    resize_factor: f32,

    /// Encoded frames allowed to wait for upload; more is smoother, less is lower latency
    #[arg(long, default_value_t = 2)]
    buffer_size: usize,

    /// Capture width
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Capture height
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Upload request timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    request_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("frame_relay=info".parse()?)
                .add_directive("capture_sender=info".parse()?),
        )
        .init();

    let mut senders = Vec::with_capacity(args.cameras.len());
    let started = Instant::now();

    for (index, camera_id) in args.cameras.iter().enumerate() {
        let config = SenderConfig::new(args.server.clone(), camera_id.clone())
            .target_fps(args.fps)
            .quality(args.quality)
            .resize_factor(args.resize_factor)
            .queue_capacity(args.buffer_size)
            .resolution(args.width, args.height)
            .request_timeout(Duration::from_millis(args.request_timeout_ms));

        let uploader = HttpUploader::new(&config.server_url, config.request_timeout)?;
        let camera = TestPatternCamera::open(index as u32, config.width, config.height)?;

        let mut sender = CaptureSender::new(config)?;
        sender.start(camera, uploader)?;
        senders.push(sender);
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    for sender in &senders {
        sender.stop();
    }
    for sender in &mut senders {
        sender.join_capture().await;
        let stats = sender.stats();
        tracing::info!(
            camera = %sender.camera_id(),
            captured = stats.frames_captured,
            dropped = stats.frames_dropped,
            uploaded = stats.frames_uploaded,
            failures = stats.upload_failures,
            bitrate = stats.bitrate(started.elapsed()),
            "Sender finished"
        );
    }

    Ok(())
}
