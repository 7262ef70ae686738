//! Frame relay server
//!
//! Run with: cargo run --bin relay_server -- [--host 0.0.0.0] [--port 5000]
//!
//! Upload:  curl -F frame=@image.jpg http://localhost:5000/upload/cam1
//! View:    open http://localhost:5000/stream/cam1 in a browser

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use frame_relay::{RelayConfig, RelayServer, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "relay_server")]
#[command(about = "Relay the latest camera frames to MJPEG viewers", long_about = None)]
struct Args {
    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0", env = "FRAME_RELAY_HOST")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = 5000, env = "FRAME_RELAY_PORT")]
    port: u16,

    /// Milliseconds a stream waits for a frame before sending a keep-alive
    #[arg(long, default_value_t = 1000)]
    poll_timeout_ms: u64,

    /// Seconds between per-camera ingest frame rate reports
    #[arg(long, default_value_t = 5.0)]
    report_interval: f64,

    /// Largest accepted upload in MiB
    #[arg(long, default_value_t = 16)]
    max_upload_mb: usize,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("frame_relay=info".parse()?)
                .add_directive("relay_server=info".parse()?),
        )
        .init();

    if !(args.report_interval.is_finite() && args.report_interval > 0.0) {
        return Err(format!("report interval must be positive, got {}", args.report_interval).into());
    }

    let mut config = ServerConfig::with_addr(SocketAddr::new(args.host, args.port))
        .max_upload_bytes(args.max_upload_mb * 1024 * 1024);
    if args.no_cors {
        config = config.disable_cors();
    }

    let relay_config = RelayConfig::default()
        .poll_timeout(Duration::from_millis(args.poll_timeout_ms))
        .report_interval(Duration::from_secs_f64(args.report_interval));

    let server = RelayServer::with_relay_config(config, relay_config);

    tracing::info!(addr = %server.bind_addr(), "Starting frame relay");

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!("Frame relay stopped");
    Ok(())
}
