//! Flashcrowd light show client with time sync and reconnection support.
//!
//! Joins an event on the relay, keeps its clock in sync with the server and
//! lights the output (torch, or screen as fallback) when effects fire.
//! Hosts can type effect commands at the prompt.
//! Automatically reconnects on disconnection (max 5 attempts with 5 second interval).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin flashcrowd-client -- --event-id 1 --role host
//! cargo run --bin flashcrowd-client -- -e 1
//! ```

use clap::Parser;

use flashcrowd_client::{
    ClientConfig,
    config::{DEFAULT_MARGIN_FLOOR_MS, DEFAULT_MARGIN_SCALE, DEFAULT_SYNC_INTERVAL_MS, DEFAULT_URL},
    run_client,
    time_sync::DEFAULT_SMOOTHING,
};
use flashcrowd_shared::{logger::setup_logger, protocol::Role};

#[derive(Parser, Debug)]
#[command(name = "flashcrowd-client")]
#[command(about = "Synchronized light show client (host or attendee)", long_about = None)]
struct Args {
    /// Event to join
    #[arg(short = 'e', long)]
    event_id: u64,

    /// host or attendee
    #[arg(short = 'r', long, default_value = "attendee")]
    role: Role,

    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = DEFAULT_URL)]
    url: String,

    /// Time sync probe interval, clamped to 1500-2000 ms
    #[arg(long, default_value_t = DEFAULT_SYNC_INTERVAL_MS)]
    sync_interval_ms: u64,

    /// Weight of the previous offset estimate, clamped to 0.6-0.8
    #[arg(long, default_value_t = DEFAULT_SMOOTHING)]
    smoothing: f64,

    /// Minimum scheduling margin for host effects
    #[arg(long, default_value_t = DEFAULT_MARGIN_FLOOR_MS)]
    margin_floor_ms: i64,

    /// Latency multiplier for the host scheduling margin
    #[arg(long, default_value_t = DEFAULT_MARGIN_SCALE)]
    margin_scale: f64,

    /// Flash the screen only
    #[arg(long)]
    no_torch: bool,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let config = ClientConfig {
        url: args.url,
        event_id: args.event_id,
        role: args.role,
        smoothing: args.smoothing,
        margin_floor_ms: args.margin_floor_ms,
        margin_scale: args.margin_scale,
        torch_enabled: !args.no_torch,
        ..ClientConfig::default()
    }
    .with_sync_interval_ms(args.sync_interval_ms);

    if let Err(e) = run_client(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
