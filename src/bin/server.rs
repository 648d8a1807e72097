//! Framecast Server Binary
//!
//! Starts the TCP server for the framed message protocol.

use clap::Parser;
use framecast::{Config, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// Framecast Server
#[derive(Parser, Debug)]
#[command(name = "framecast-server")]
#[command(about = "Length-prefixed TCP message server with broadcast support")]
#[command(version)]
struct Args {
    /// Host to bind
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port to bind
    #[arg(short, long, default_value = "9999")]
    port: u16,

    /// Socket read chunk size in bytes
    #[arg(long, default_value = "4096")]
    chunk_size: usize,

    /// Maximum frame payload size in MB
    #[arg(long, default_value = "16")]
    max_frame_mb: usize,

    /// Read idle timeout in milliseconds (0 disables it)
    #[arg(long, default_value = "0")]
    idle_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,framecast=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Framecast Server v{}", framecast::VERSION);
    tracing::info!("Listen address: {}:{}", args.host, args.port);

    let config = Config::builder()
        .host(&args.host)
        .port(args.port)
        .read_chunk_size(args.chunk_size)
        .max_frame_size(args.max_frame_mb * 1024 * 1024)
        .idle_timeout_ms(args.idle_timeout_ms)
        .build();

    let mut server = Server::new(config);
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
