//! WebSocket client session management.
//!
//! One session = one connection. It owns its estimator and scheduler; both are
//! dropped (timers cancelled, output off) on every exit path.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use crate::{
    command::{Command, parse_command},
    config::ClientConfig,
    dispatcher::EffectDispatcher,
    error::ClientError,
    formatter::MessageFormatter,
    output::LightOutput,
    scheduler::EffectScheduler,
    time_sync::TimeSyncEstimator,
    ui::redisplay_prompt,
};
use flashcrowd_shared::{
    protocol::{ClientMessage, Role, ServerMessage},
    time::{Clock, SystemClock},
};

/// Error text the relay sends for an unknown event
const EVENT_NOT_FOUND: &str = "Event not found";

/// Per-connection state shared by the reader and the prompt
#[derive(Clone)]
pub struct SessionContext {
    pub role: Role,
    pub estimator: Arc<Mutex<TimeSyncEstimator>>,
    pub scheduler: Arc<Mutex<EffectScheduler>>,
    pub output: Arc<Mutex<LightOutput>>,
}

impl SessionContext {
    pub fn new(
        role: Role,
        clock: Arc<dyn Clock>,
        smoothing: f64,
        output: Arc<Mutex<LightOutput>>,
    ) -> Self {
        Self {
            role,
            estimator: Arc::new(Mutex::new(TimeSyncEstimator::new(clock, smoothing))),
            scheduler: Arc::new(Mutex::new(EffectScheduler::new(output.clone()))),
            output,
        }
    }

    /// Apply one message from the relay.
    ///
    /// Only an unknown event ends the session; everything else is displayed or
    /// folded into local state.
    pub async fn handle_server_message(&self, message: ServerMessage) -> Result<(), ClientError> {
        match message {
            ServerMessage::TimeSyncReply {
                client_send_time,
                server_receive_time,
                ..
            } => {
                self.estimator
                    .lock()
                    .await
                    .record_reply(client_send_time, server_receive_time);
                return Ok(());
            }
            ServerMessage::Effect { effect } => {
                let server_now = self.estimator.lock().await.now();
                print!("{}", MessageFormatter::format_effect(&effect, server_now));
                self.scheduler
                    .lock()
                    .await
                    .schedule(effect, server_now)
                    .await;
            }
            ServerMessage::Joined { event_id } => {
                let capability = self.output.lock().await.capability();
                print!(
                    "{}",
                    MessageFormatter::format_joined(event_id, self.role, capability)
                );
                print!("{}", MessageFormatter::format_help(self.role));
            }
            ServerMessage::ParticipantUpdate { active, total } => {
                print!(
                    "{}",
                    MessageFormatter::format_participant_update(active, total)
                );
            }
            ServerMessage::Error { message } => {
                print!("{}", MessageFormatter::format_error(&message));
                if message == EVENT_NOT_FOUND {
                    return Err(ClientError::EventNotFound);
                }
            }
        }
        redisplay_prompt(self.role);
        Ok(())
    }

    /// Run one prompt command
    pub async fn handle_command(&self, line: &str, dispatcher: Option<&EffectDispatcher>) {
        match parse_command(line) {
            Ok(Command::Effect(effect)) => match dispatcher {
                Some(dispatcher) => {
                    if dispatcher.dispatch(effect).await.is_none() {
                        println!("not connected, effect dropped");
                    }
                }
                None => println!("only the host can trigger effects"),
            },
            Ok(Command::Status) => {
                let estimate = self.estimator.lock().await.estimate();
                let capability = self.output.lock().await.capability();
                print!("{}", MessageFormatter::format_status(estimate, capability));
            }
            Ok(Command::Help) => print!("{}", MessageFormatter::format_help(self.role)),
            Err(e) => println!("{}", e),
        }
    }

    /// Cancel timers and turn the output off
    pub async fn shutdown(&self) {
        self.scheduler.lock().await.shutdown().await;
    }
}

/// Run the WebSocket client session
///
/// Returns `Ok(())` when the user closed the prompt, an error when the
/// connection was lost or the event does not exist.
pub async fn run_client_session(
    config: &ClientConfig,
    output: Arc<Mutex<LightOutput>>,
    input: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    let (ws_stream, _response) = connect_async(config.url.as_str()).await?;
    tracing::info!("Connected to {}", config.url);

    let (mut write, mut read) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ClientMessage>();

    let context = SessionContext::new(
        config.role,
        Arc::new(SystemClock),
        config.smoothing,
        output,
    );
    let dispatcher = (config.role == Role::Host).then(|| {
        let mut dispatcher = EffectDispatcher::new(
            config.event_id,
            context.estimator.clone(),
            context.scheduler.clone(),
            config.margin_floor_ms,
            config.margin_scale,
        );
        dispatcher.connect(outbound_tx.clone());
        dispatcher
    });

    let _ = outbound_tx.send(ClientMessage::JoinEvent {
        event_id: config.event_id,
        role: config.role,
    });

    // Writer: every outbound message goes through one queue
    let mut write_task: JoinHandle<Result<(), ClientError>> = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let json = message.to_json()?;
            write.send(Message::Text(json.into())).await?;
        }
        Ok(())
    });

    // Time sync probes; the first one goes out immediately
    let sync_task = {
        let estimator = context.estimator.clone();
        let outbound_tx = outbound_tx.clone();
        let sync_interval = config.sync_interval;
        tokio::spawn(async move {
            let mut ticker = interval(sync_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let probe = estimator.lock().await.begin_probe();
                if outbound_tx.send(probe).is_err() {
                    break;
                }
            }
        })
    };

    let reader_context = context.clone();
    let mut read_task: JoinHandle<Result<(), ClientError>> = tokio::spawn(async move {
        while let Some(frame) = read.next().await {
            match frame {
                Ok(Message::Text(text)) => match ServerMessage::from_json(text.as_str()) {
                    Ok(message) => reader_context.handle_server_message(message).await?,
                    Err(e) => tracing::warn!("Ignoring unparseable message: {} ({})", e, text.as_str()),
                },
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed the connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    break;
                }
                _ => {}
            }
        }
        Err(ClientError::ConnectionError("Connection lost".to_string()))
    });

    let prompt_loop = async {
        while let Some(line) = input.recv().await {
            context.handle_command(&line, dispatcher.as_ref()).await;
            redisplay_prompt(config.role);
        }
    };

    let result = tokio::select! {
        read_result = &mut read_task => flatten(read_result),
        write_result = &mut write_task => match flatten(write_result) {
            Ok(()) => Err(ClientError::ConnectionError("Connection lost".to_string())),
            Err(e) => Err(e),
        },
        _ = prompt_loop => Ok(()),
    };

    read_task.abort();
    write_task.abort();
    sync_task.abort();
    context.shutdown().await;

    result
}

fn flatten(
    joined: Result<Result<(), ClientError>, tokio::task::JoinError>,
) -> Result<(), ClientError> {
    joined.unwrap_or_else(|e| Err(ClientError::ConnectionError(e.to_string())))
}
