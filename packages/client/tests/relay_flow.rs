//! End-to-end tests: relay server and clients in one process.
//!
//! The server is bound to an ephemeral port; hosts are driven over raw
//! WebSocket frames, attendees either the same way or through the real client
//! session.

use std::{
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use futures_util::{SinkExt, StreamExt};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{Mutex, mpsc},
    time::timeout,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};

use flashcrowd_client::{
    ClientConfig,
    output::{LightOutput, Screen},
    session::run_client_session,
};
use flashcrowd_server::{
    domain::{EventStore, MessagePusher},
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryEventStore},
    ui::Server,
    usecase::{CreateEventUseCase, GetEventUseCase, RelayConfig, RelayRouter, TimeSyncUseCase},
};
use flashcrowd_shared::{
    protocol::{ClientMessage, EffectDescriptor, EffectType, Role, ServerMessage},
    time::{Clock, SystemClock, now_millis},
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

/// Relay server running on a background task
struct TestServer {
    port: u16,
}

impl TestServer {
    async fn start() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new(clock.clone()));
        let message_pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());
        let (relay_router, _router_task) = RelayRouter::spawn(
            store.clone(),
            message_pusher.clone(),
            clock.clone(),
            RelayConfig::default(),
        );
        let server = Server::new(
            relay_router,
            Arc::new(TimeSyncUseCase::new(clock)),
            Arc::new(CreateEventUseCase::new(store.clone())),
            Arc::new(GetEventUseCase::new(store)),
            message_pusher,
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let port = listener.local_addr().expect("No local address").port();
        tokio::spawn(server.serve(listener, std::future::pending()));

        TestServer { port }
    }

    fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    /// Create an event over HTTP and return its JSON body
    async fn create_event(&self, name: &str) -> serde_json::Value {
        let response = reqwest::Client::new()
            .post(self.http_url("/api/events"))
            .json(&serde_json::json!({"name": name, "hostId": "host-1"}))
            .send()
            .await
            .expect("Failed to create event");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        response.json().await.expect("Invalid event body")
    }

    async fn active_participants(&self, event_id: u64) -> u64 {
        let stats: serde_json::Value =
            reqwest::get(self.http_url(&format!("/api/events/{}/stats", event_id)))
                .await
                .expect("Failed to get stats")
                .json()
                .await
                .expect("Invalid stats body");
        stats["activeNow"].as_u64().unwrap_or_default()
    }

    /// Poll the stats endpoint until `expected` connections are in the room
    async fn wait_for_active(&self, event_id: u64, expected: u64) {
        timeout(WAIT, async {
            while self.active_participants(event_id).await != expected {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("Participants did not join in time");
    }
}

async fn connect(server: &TestServer) -> Socket {
    let (socket, _) = connect_async(server.ws_url())
        .await
        .expect("Failed to connect");
    socket
}

async fn send(socket: &mut Socket, message: ClientMessage) {
    let json = message.to_json().expect("Failed to encode");
    socket
        .send(Message::Text(json.into()))
        .await
        .expect("Failed to send");
}

/// Receive messages until one matches `predicate`
async fn recv_until<F>(socket: &mut Socket, predicate: F) -> ServerMessage
where
    F: Fn(&ServerMessage) -> bool,
{
    timeout(WAIT, async {
        loop {
            let frame = socket
                .next()
                .await
                .expect("Connection closed")
                .expect("WebSocket error");
            if let Message::Text(text) = frame {
                let message = ServerMessage::from_json(text.as_str()).expect("Invalid message");
                if predicate(&message) {
                    return message;
                }
            }
        }
    })
    .await
    .expect("Timed out waiting for message")
}

async fn join(socket: &mut Socket, event_id: u64, role: Role) {
    send(socket, ClientMessage::JoinEvent { event_id, role }).await;
    let joined = recv_until(socket, |m| matches!(m, ServerMessage::Joined { .. })).await;
    assert_eq!(joined, ServerMessage::Joined { event_id });
}

fn event_id_of(event: &serde_json::Value) -> u64 {
    event["id"].as_u64().expect("Event id missing")
}

#[tokio::test]
async fn test_create_event_and_lookup_by_pin() {
    // テスト項目: HTTP でイベントを作成し、PIN で参照できる
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let event = server.create_event("Finale").await;
    let pin = event["pin"].as_str().expect("PIN missing").to_string();
    let found: serde_json::Value =
        reqwest::get(server.http_url(&format!("/api/events/join/{}", pin.to_lowercase())))
            .await
            .expect("Failed to look up PIN")
            .json()
            .await
            .expect("Invalid event body");

    // then (期待する結果):
    assert_eq!(pin.len(), 9);
    assert_eq!(found["id"], event["id"]);
    assert_eq!(found["name"], "Finale");
    assert_eq!(found["isActive"], true);
}

#[tokio::test]
async fn test_join_broadcasts_participant_counts() {
    // テスト項目: 参加すると joined が返り、ルーム全員に参加人数が配信される
    // given (前提条件):
    let server = TestServer::start().await;
    let event_id = event_id_of(&server.create_event("Counts").await);
    let mut host = connect(&server).await;
    join(&mut host, event_id, Role::Host).await;

    // when (操作):
    let mut attendee = connect(&server).await;
    join(&mut attendee, event_id, Role::Attendee).await;

    // then (期待する結果):
    let expected = ServerMessage::ParticipantUpdate {
        active: 2,
        total: 2,
    };
    assert_eq!(
        recv_until(&mut host, |m| *m == expected).await,
        expected.clone()
    );
    assert_eq!(
        recv_until(&mut attendee, |m| matches!(
            m,
            ServerMessage::ParticipantUpdate { .. }
        ))
        .await,
        expected
    );
}

#[tokio::test]
async fn test_join_unknown_event_returns_error() {
    // テスト項目: 存在しないイベントへの参加は "Event not found" エラーになる
    // given (前提条件):
    let server = TestServer::start().await;
    let mut socket = connect(&server).await;

    // when (操作):
    send(
        &mut socket,
        ClientMessage::JoinEvent {
            event_id: 999,
            role: Role::Attendee,
        },
    )
    .await;

    // then (期待する結果):
    let message = recv_until(&mut socket, |_| true).await;
    assert_eq!(
        message,
        ServerMessage::Error {
            message: "Event not found".to_string()
        }
    );
}

#[tokio::test]
async fn test_time_sync_reply_echoes_probe() {
    // テスト項目: time_sync に対して送信時刻をそのまま返し、サーバー時刻を付与する
    // given (前提条件):
    let server = TestServer::start().await;
    let mut socket = connect(&server).await;
    let sent_at = now_millis();

    // when (操作):
    send(
        &mut socket,
        ClientMessage::TimeSync {
            client_send_time: sent_at,
        },
    )
    .await;

    // then (期待する結果):
    let ServerMessage::TimeSyncReply {
        client_send_time,
        server_receive_time,
        server_send_time,
    } = recv_until(&mut socket, |_| true).await
    else {
        panic!("Expected time_sync_reply");
    };
    assert_eq!(client_send_time, sent_at);
    assert!(server_receive_time >= sent_at);
    assert!(server_send_time >= server_receive_time);
}

#[tokio::test]
async fn test_host_effect_is_broadcast_with_start_time() {
    // テスト項目: startAt のないホストのエフェクトにサーバーが開始時刻を付けて全員に配信する
    // given (前提条件):
    let server = TestServer::start().await;
    let event_id = event_id_of(&server.create_event("Broadcast").await);
    let mut host = connect(&server).await;
    join(&mut host, event_id, Role::Host).await;
    let mut attendee = connect(&server).await;
    join(&mut attendee, event_id, Role::Attendee).await;
    let sent_at = now_millis();

    // when (操作):
    send(
        &mut host,
        ClientMessage::HostEffect {
            event_id,
            effect: EffectDescriptor::new(EffectType::Pulse).with_color("#FF00FF"),
        },
    )
    .await;

    // then (期待する結果): ホスト自身にも同じエフェクトが届く
    let is_effect = |m: &ServerMessage| matches!(m, ServerMessage::Effect { .. });
    let ServerMessage::Effect { effect } = recv_until(&mut attendee, is_effect).await else {
        unreachable!();
    };
    assert_eq!(effect.kind, EffectType::Pulse);
    assert_eq!(effect.color.as_deref(), Some("#FF00FF"));
    let start_at = effect.start_at.expect("startAt not filled");
    assert!(start_at >= sent_at + 200);

    let echoed = recv_until(&mut host, is_effect).await;
    assert_eq!(echoed, ServerMessage::Effect { effect });
}

#[tokio::test]
async fn test_superseded_host_cannot_broadcast() {
    // テスト項目: 後から参加したホストが権限を持ち、前のホストのエフェクトは配信されない
    // given (前提条件):
    let server = TestServer::start().await;
    let event_id = event_id_of(&server.create_event("Handover").await);
    let mut first_host = connect(&server).await;
    join(&mut first_host, event_id, Role::Host).await;
    let mut attendee = connect(&server).await;
    join(&mut attendee, event_id, Role::Attendee).await;
    let mut second_host = connect(&server).await;
    join(&mut second_host, event_id, Role::Host).await;

    // when (操作):
    send(
        &mut first_host,
        ClientMessage::HostEffect {
            event_id,
            effect: EffectDescriptor::new(EffectType::Pulse),
        },
    )
    .await;
    send(
        &mut second_host,
        ClientMessage::HostEffect {
            event_id,
            effect: EffectDescriptor::new(EffectType::TorchOff).with_start_at(1),
        },
    )
    .await;

    // then (期待する結果): attendee が最初に受け取るエフェクトは 2 人目のホストのもの
    let received = recv_until(&mut attendee, |m| {
        matches!(m, ServerMessage::Effect { .. })
    })
    .await;
    assert_eq!(
        received,
        ServerMessage::Effect {
            effect: EffectDescriptor::new(EffectType::TorchOff).with_start_at(1)
        }
    );
}

/// Screen that remembers the colors it was asked to show
#[derive(Clone, Default)]
struct SharedScreen {
    colors: Arc<StdMutex<Vec<Option<String>>>>,
}

impl SharedScreen {
    fn colors(&self) -> Vec<Option<String>> {
        self.colors.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Screen for SharedScreen {
    fn flash(&self, color: Option<&str>) {
        if let Ok(mut colors) = self.colors.lock() {
            colors.push(color.map(str::to_string));
        }
    }
}

#[tokio::test]
async fn test_client_session_follows_host_effects() {
    // テスト項目: クライアントセッションがホストのエフェクトを受信して出力を点灯させ、入力終了で正常終了する
    // given (前提条件):
    let server = TestServer::start().await;
    let event_id = event_id_of(&server.create_event("Session").await);
    let mut host = connect(&server).await;
    join(&mut host, event_id, Role::Host).await;

    let screen = SharedScreen::default();
    let output = Arc::new(Mutex::new(LightOutput::new(None, Box::new(screen.clone()))));
    let config = ClientConfig {
        url: server.ws_url(),
        event_id,
        role: Role::Attendee,
        ..ClientConfig::default()
    };
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    let session_output = output.clone();
    let session = tokio::spawn(async move {
        run_client_session(&config, session_output, &mut input_rx).await
    });
    server.wait_for_active(event_id, 2).await;

    // when (操作):
    send(
        &mut host,
        ClientMessage::HostEffect {
            event_id,
            effect: EffectDescriptor::new(EffectType::TorchOn).with_color("#00FF00"),
        },
    )
    .await;

    // then (期待する結果):
    timeout(WAIT, async {
        while !output.lock().await.is_lit() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("Output was not lit");
    assert_eq!(screen.colors(), vec![Some("#00FF00".to_string())]);

    drop(input_tx);
    let result = timeout(WAIT, session)
        .await
        .expect("Session did not end")
        .expect("Session task panicked");
    assert_eq!(result, Ok(()));
    assert!(!output.lock().await.is_lit());
    server.wait_for_active(event_id, 1).await;
}
