//! Flashcrowd relay server.
//!
//! Relays host effects to every phone in an event room and answers clock-sync
//! probes.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin flashcrowd-server
//! cargo run --bin flashcrowd-server -- --host 0.0.0.0 --port 3000 --seed-event "Main Stage"
//! ```

use std::sync::Arc;

use clap::Parser;
use flashcrowd_server::{
    domain::{EventStore, MessagePusher},
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryEventStore},
    ui::Server,
    usecase::{CreateEventUseCase, GetEventUseCase, RelayConfig, RelayRouter, TimeSyncUseCase},
};
use flashcrowd_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

#[derive(Parser, Debug)]
#[command(name = "flashcrowd-server")]
#[command(about = "Relay server for synchronized phone light shows", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Lead time added to effects submitted without startAt (ms)
    #[arg(long, default_value_t = RelayConfig::default().default_effect_margin_ms)]
    effect_margin_ms: i64,

    /// Create an event with this name at start-up
    #[arg(long)]
    seed_event: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. Clock
    // 2. EventStore
    // 3. MessagePusher
    // 4. UseCases and RelayRouter
    // 5. Server

    // 1. Clock (server time is the reference for every client)
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // 2. EventStore (in-memory)
    let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new(clock.clone()));

    // 3. MessagePusher (WebSocket implementation)
    let message_pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());

    // 4. UseCases and RelayRouter
    let config = RelayConfig {
        default_effect_margin_ms: args.effect_margin_ms,
    };
    let (relay_router, _router_task) = RelayRouter::spawn(
        store.clone(),
        message_pusher.clone(),
        clock.clone(),
        config,
    );
    let time_sync_usecase = Arc::new(TimeSyncUseCase::new(clock));
    let create_event_usecase = Arc::new(CreateEventUseCase::new(store.clone()));
    let get_event_usecase = Arc::new(GetEventUseCase::new(store));

    if let Some(name) = args.seed_event {
        match create_event_usecase
            .execute(name, "seed".to_string())
            .await
        {
            Ok(event) => tracing::info!(
                "Seeded event '{}': id={} pin={}",
                event.name.as_str(),
                event.id.value(),
                event.pin
            ),
            Err(e) => {
                tracing::error!("Failed to seed event: {}", e);
                std::process::exit(1);
            }
        }
    }

    // 5. Create and run the server
    let server = Server::new(
        relay_router,
        time_sync_usecase,
        create_event_usecase,
        get_event_usecase,
        message_pusher,
    );
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
