//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    domain::{ConnectionId, EffectDescriptor, EventId, Role},
    ui::state::AppState,
    usecase::RelayError,
};
use flashcrowd_shared::protocol::{ClientMessage, ServerMessage};

/// Request of one connection that goes through the relay router
#[derive(Debug, Clone, PartialEq)]
enum RelayRequest {
    Join { event_id: EventId, role: Role },
    Effect { event_id: EventId, effect: EffectDescriptor },
    Leave,
}

/// Query parameters for WebSocket connection (auto-join)
#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    pub event_id: Option<u64>,
    pub role: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> impl IntoResponse {
    let connection_id = ConnectionId::generate();
    ws.on_upgrade(move |socket| handle_socket(socket, state, connection_id, query))
}

/// Spawns a task that forwards queued messages to the WebSocket sink.
///
/// Every message for this connection (replies, broadcasts) goes through the
/// same channel, so delivery order is the order of enqueueing.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

/// Spawns a task that hands the router requests of one connection over in
/// arrival order.
///
/// The reader never waits for the router, so time sync probes are stamped as
/// soon as they arrive.
fn relay_loop(
    state: Arc<AppState>,
    connection_id: ConnectionId,
    mut rx: mpsc::UnboundedReceiver<RelayRequest>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            relay(&state, &connection_id, request).await;
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    connection_id: ConnectionId,
    query: ConnectQuery,
) {
    let (sender, mut receiver) = socket.split();

    let (tx, rx) = mpsc::unbounded_channel();
    state
        .message_pusher
        .register_client(connection_id.clone(), tx)
        .await;
    tracing::info!("Connection '{}' opened", connection_id);

    let mut send_task = pusher_loop(rx, sender);

    let (relay_tx, relay_rx) = mpsc::unbounded_channel();
    let relay_task = relay_loop(state.clone(), connection_id.clone(), relay_rx);

    if let Some(event_id) = query.event_id {
        let role = Role::from_query(query.role.as_deref().unwrap_or_default());
        let _ = relay_tx.send(RelayRequest::Join {
            event_id: EventId::new(event_id),
            role,
        });
    }

    let state_clone = state.clone();
    let connection_id_clone = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            // Stamp arrival before parsing
            let received_at = state_clone.time_sync_usecase.received_at();

            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error on '{}': {}", connection_id_clone, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    handle_text(
                        &state_clone,
                        &connection_id_clone,
                        text.as_str(),
                        received_at,
                        &relay_tx,
                    )
                    .await;
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", connection_id_clone);
                    break;
                }
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => {
            recv_task.abort();
            let _ = recv_task.await;
        }
    };

    // The reader is gone, so the queue closes once its pending requests are done
    let _ = relay_task.await;

    if let Err(e) = state.relay_router.leave(connection_id.clone()).await {
        tracing::warn!("Failed to remove '{}' from its room: {}", connection_id, e);
    }
    state.message_pusher.unregister_client(&connection_id).await;
    tracing::info!("Connection '{}' closed", connection_id);
}

async fn handle_text(
    state: &AppState,
    connection_id: &ConnectionId,
    text: &str,
    received_at: i64,
    relay_tx: &mpsc::UnboundedSender<RelayRequest>,
) {
    let message = match ClientMessage::from_json(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(
                "Ignoring unparseable frame from '{}': {} ({})",
                connection_id,
                e,
                text
            );
            return;
        }
    };

    let request = match message {
        ClientMessage::TimeSync { client_send_time } => {
            let reply = state
                .time_sync_usecase
                .reply(client_send_time, received_at);
            push(state, connection_id, &reply).await;
            return;
        }
        ClientMessage::JoinEvent { event_id, role } => RelayRequest::Join {
            event_id: EventId::new(event_id),
            role,
        },
        ClientMessage::HostEffect { event_id, effect } => RelayRequest::Effect {
            event_id: EventId::new(event_id),
            effect,
        },
        ClientMessage::LeaveEvent => RelayRequest::Leave,
    };

    if relay_tx.send(request).is_err() {
        tracing::warn!("Relay queue of '{}' is closed", connection_id);
    }
}

async fn relay(state: &AppState, connection_id: &ConnectionId, request: RelayRequest) {
    match request {
        RelayRequest::Join { event_id, role } => {
            join(state, connection_id, event_id, role).await;
        }
        RelayRequest::Effect { event_id, effect } => {
            match state
                .relay_router
                .submit_effect(connection_id.clone(), event_id, effect)
                .await
            {
                Ok(_) | Err(RelayError::NotAuthorizedHost) => {}
                Err(e) => {
                    tracing::error!("Failed to relay effect from '{}': {}", connection_id, e);
                }
            }
        }
        RelayRequest::Leave => {
            if let Err(e) = state.relay_router.leave(connection_id.clone()).await {
                tracing::warn!("Failed to leave for '{}': {}", connection_id, e);
            }
        }
    }
}

async fn join(state: &AppState, connection_id: &ConnectionId, event_id: EventId, role: Role) {
    if let Err(e) = state
        .relay_router
        .join(connection_id.clone(), event_id, role)
        .await
    {
        let error = ServerMessage::Error {
            message: e.to_string(),
        };
        push(state, connection_id, &error).await;
    }
}

async fn push(state: &AppState, connection_id: &ConnectionId, message: &ServerMessage) {
    let json = match message.to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to encode message for '{}': {}", connection_id, e);
            return;
        }
    };
    if let Err(e) = state.message_pusher.push_to(connection_id, &json).await {
        tracing::warn!("Failed to push to '{}': {}", connection_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{EffectType, EventStore, MessagePusher},
        infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryEventStore},
        usecase::{CreateEventUseCase, GetEventUseCase, RelayConfig, RelayRouter, TimeSyncUseCase},
    };
    use flashcrowd_shared::time::{Clock, FixedClock};

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - ルーターへの要求は接続ごとのキューに到着順で積まれ、受信ループはその完了を待たない
    // - time_sync はキューを経由せず、受信時刻でそのまま応答される
    // ========================================

    const NOW: i64 = 1_700_000_000_000;

    async fn create_test_state() -> (Arc<AppState>, ConnectionId, mpsc::UnboundedReceiver<String>) {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(NOW));
        let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new(clock.clone()));
        let message_pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());
        let (relay_router, _task) = RelayRouter::spawn(
            store.clone(),
            message_pusher.clone(),
            clock.clone(),
            RelayConfig::default(),
        );
        let state = Arc::new(AppState {
            relay_router,
            time_sync_usecase: Arc::new(TimeSyncUseCase::new(clock)),
            create_event_usecase: Arc::new(CreateEventUseCase::new(store.clone())),
            get_event_usecase: Arc::new(GetEventUseCase::new(store)),
            message_pusher,
        });

        let connection_id = ConnectionId::new("host-conn".to_string()).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        state
            .message_pusher
            .register_client(connection_id.clone(), tx)
            .await;
        (state, connection_id, rx)
    }

    #[tokio::test]
    async fn test_time_sync_is_answered_while_relay_requests_are_pending() {
        // テスト項目: ルーター要求が処理待ちでも、後から届いた time_sync は受信時刻で即座に応答される
        // given (前提条件): キューの受信側を処理しない（ルーターが混雑している状況）
        let (state, connection_id, mut pushed) = create_test_state().await;
        let (relay_tx, mut relay_rx) = mpsc::unbounded_channel();
        let effect = EffectDescriptor::new(EffectType::Strobe).with_frequency(5.0);

        // when (操作):
        let frames = [
            ClientMessage::JoinEvent {
                event_id: 1,
                role: Role::Host,
            },
            ClientMessage::HostEffect {
                event_id: 1,
                effect: effect.clone(),
            },
            ClientMessage::TimeSync {
                client_send_time: NOW - 40,
            },
        ];
        for (i, frame) in frames.iter().enumerate() {
            let json = serde_json::to_string(frame).unwrap();
            handle_text(&state, &connection_id, &json, NOW + i as i64, &relay_tx).await;
        }

        // then (期待する結果):
        let reply = ServerMessage::from_json(&pushed.try_recv().unwrap()).unwrap();
        assert_eq!(
            reply,
            ServerMessage::TimeSyncReply {
                client_send_time: NOW - 40,
                server_receive_time: NOW + 2,
                server_send_time: NOW,
            }
        );
        assert!(pushed.try_recv().is_err());
        assert_eq!(
            relay_rx.try_recv().unwrap(),
            RelayRequest::Join {
                event_id: EventId::new(1),
                role: Role::Host
            }
        );
        assert_eq!(
            relay_rx.try_recv().unwrap(),
            RelayRequest::Effect {
                event_id: EventId::new(1),
                effect
            }
        );
        assert!(relay_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unparseable_frame_is_ignored() {
        // テスト項目: 解析できないフレームは何も送らず、キューにも積まない
        // given (前提条件):
        let (state, connection_id, mut pushed) = create_test_state().await;
        let (relay_tx, mut relay_rx) = mpsc::unbounded_channel();

        // when (操作):
        handle_text(&state, &connection_id, "{\"type\":\"dance\"}", NOW, &relay_tx).await;

        // then (期待する結果):
        assert!(pushed.try_recv().is_err());
        assert!(relay_rx.try_recv().is_err());
    }
}
