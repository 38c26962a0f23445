//! Client execution logic with reconnection support.

use std::{sync::Arc, time::Duration};

use tokio::sync::Mutex;

use crate::{
    config::ClientConfig,
    domain::{should_attempt_reconnect, should_exit_immediately},
    error::ClientError,
    output::{ConsoleScreen, ConsoleTorch, LightOutput, Torch},
    session::run_client_session,
    ui::spawn_line_reader,
};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL_SECS: u64 = 5;

/// Run the client with reconnection logic
///
/// The light output and the terminal reader outlive individual sessions; each
/// reconnect starts a fresh clock estimate and scheduler.
pub async fn run_client(config: ClientConfig) -> Result<(), ClientError> {
    let torch: Option<Box<dyn Torch>> = if config.torch_enabled {
        Some(Box::new(ConsoleTorch))
    } else {
        None
    };
    let output = Arc::new(Mutex::new(LightOutput::new(torch, Box::new(ConsoleScreen))));
    let mut input = spawn_line_reader(config.role);
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Attempting to connect to {} for event {} as {} (attempt {}/{})",
            config.url,
            config.event_id,
            config.role,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        match run_client_session(&config, output.clone(), &mut input).await {
            Ok(()) => {
                tracing::info!("Client session ended normally");
                return Ok(());
            }
            Err(e) if should_exit_immediately(&e) => {
                tracing::error!("Event {} does not exist. Exiting.", config.event_id);
                return Err(e);
            }
            Err(e) => {
                tracing::warn!("Connection lost: {}", e);
                reconnect_count += 1;

                if !should_attempt_reconnect(&e, reconnect_count, MAX_RECONNECT_ATTEMPTS) {
                    tracing::error!(
                        "Failed to reconnect after {} attempts. Exiting.",
                        MAX_RECONNECT_ATTEMPTS
                    );
                    return Err(e);
                }

                tracing::info!(
                    "Reconnecting in {} seconds... (attempt {}/{})",
                    RECONNECT_INTERVAL_SECS,
                    reconnect_count + 1,
                    MAX_RECONNECT_ATTEMPTS
                );
                tokio::time::sleep(Duration::from_secs(RECONNECT_INTERVAL_SECS)).await;
            }
        }
    }
}
