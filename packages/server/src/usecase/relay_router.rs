//! UseCase: リレールーター
//!
//! ## 概要
//!
//! ルーム状態（メンバー、authorized host、最後のエフェクト）を 1 つのタスクが所有し、
//! コマンドを 1 件ずつ最後まで処理します。接続ハンドラは `RelayRouter` ハンドル経由で
//! コマンドを送るだけで、ルーム状態に直接触れることはありません。
//!
//! - join: メンバー追加、host なら authorized host を上書き、参加者数をブロードキャスト
//! - leave: セッションを非アクティブ化し、参加者数をブロードキャスト
//! - submit_effect: authorized host のみ受理、`startAt` を補完してルーム全員に配信
//!
//! 同じ host からのエフェクトは送信順に配信されます（単一タスク + 接続ごとの FIFO チャンネル）。

use std::{collections::HashMap, sync::Arc};

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::domain::{
    ConnectionId, EffectDescriptor, EventId, EventStore, MessagePusher, ParticipantStats, Role,
    RoomState,
};
use flashcrowd_shared::{protocol::ServerMessage, time::Clock};

use super::error::RelayError;

/// `startAt` がないエフェクトに加えるリードタイムのデフォルト値
pub const DEFAULT_EFFECT_MARGIN_MS: i64 = 200;

/// リレーの設定値
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// host が `startAt` を省略した場合は `startAt = server_now + default_effect_margin_ms`
    pub default_effect_margin_ms: i64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_effect_margin_ms: DEFAULT_EFFECT_MARGIN_MS,
        }
    }
}

/// ルータータスクへのコマンド（結果は oneshot で返す）
enum RouterCommand {
    Join {
        connection_id: ConnectionId,
        event_id: EventId,
        role: Role,
        reply: oneshot::Sender<Result<ParticipantStats, RelayError>>,
    },
    Leave {
        connection_id: ConnectionId,
        reply: oneshot::Sender<Result<Option<ParticipantStats>, RelayError>>,
    },
    SubmitEffect {
        connection_id: ConnectionId,
        event_id: EventId,
        effect: EffectDescriptor,
        reply: oneshot::Sender<Result<EffectDescriptor, RelayError>>,
    },
    Snapshot {
        event_id: EventId,
        reply: oneshot::Sender<Option<RoomState>>,
    },
}

/// リレールーターのタスクへのハンドル（Clone 可能）
#[derive(Clone)]
pub struct RelayRouter {
    commands: mpsc::UnboundedSender<RouterCommand>,
}

impl RelayRouter {
    /// ルーターのタスクを起動し、ハンドルを返す
    ///
    /// すべてのハンドルが破棄されるとタスクは終了します。
    pub fn spawn(
        store: Arc<dyn EventStore>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        config: RelayConfig,
    ) -> (Self, JoinHandle<()>) {
        let (commands, receiver) = mpsc::unbounded_channel();
        let state = RouterState {
            store,
            message_pusher,
            clock,
            config,
            rooms: HashMap::new(),
            memberships: HashMap::new(),
        };
        let task = tokio::spawn(state.run(receiver));
        (Self { commands }, task)
    }

    /// 参加処理
    ///
    /// # Returns
    ///
    /// * `Ok(ParticipantStats)` - 参加後のルームの参加者数
    /// * `Err(RelayError::EventNotFound)` - イベントが存在しない
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        event_id: EventId,
        role: Role,
    ) -> Result<ParticipantStats, RelayError> {
        self.request(|reply| RouterCommand::Join {
            connection_id,
            event_id,
            role,
            reply,
        })
        .await?
    }

    /// 退出処理（切断時も含む）
    ///
    /// どのルームにも参加していない接続の場合は `Ok(None)`
    pub async fn leave(
        &self,
        connection_id: ConnectionId,
    ) -> Result<Option<ParticipantStats>, RelayError> {
        self.request(|reply| RouterCommand::Leave {
            connection_id,
            reply,
        })
        .await?
    }

    /// エフェクト送信
    ///
    /// # Returns
    ///
    /// * `Ok(EffectDescriptor)` - 配信したエフェクト（`startAt` 補完済み）
    /// * `Err(RelayError::NotAuthorizedHost)` - 送信者が authorized host ではない（配信なし）
    pub async fn submit_effect(
        &self,
        connection_id: ConnectionId,
        event_id: EventId,
        effect: EffectDescriptor,
    ) -> Result<EffectDescriptor, RelayError> {
        self.request(|reply| RouterCommand::SubmitEffect {
            connection_id,
            event_id,
            effect,
            reply,
        })
        .await?
    }

    /// ルーム状態のスナップショット（デバッグ用）
    pub async fn room_snapshot(&self, event_id: EventId) -> Result<Option<RoomState>, RelayError> {
        self.request(|reply| RouterCommand::Snapshot { event_id, reply })
            .await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RouterCommand,
    ) -> Result<T, RelayError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| RelayError::RouterUnavailable)?;
        response.await.map_err(|_| RelayError::RouterUnavailable)
    }
}

/// ルーターのタスクが所有する状態
struct RouterState {
    store: Arc<dyn EventStore>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
    config: RelayConfig,
    rooms: HashMap<EventId, RoomState>,
    /// 1 つの接続が参加できるルームは最大 1 つ
    memberships: HashMap<ConnectionId, EventId>,
}

impl RouterState {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<RouterCommand>) {
        tracing::debug!("Relay router started");
        while let Some(command) = commands.recv().await {
            self.handle(command).await;
        }
        tracing::debug!("Relay router stopped");
    }

    async fn handle(&mut self, command: RouterCommand) {
        match command {
            RouterCommand::Join {
                connection_id,
                event_id,
                role,
                reply,
            } => {
                let result = self.join(connection_id, event_id, role).await;
                let _ = reply.send(result);
            }
            RouterCommand::Leave {
                connection_id,
                reply,
            } => {
                let result = self.leave(&connection_id).await;
                let _ = reply.send(result);
            }
            RouterCommand::SubmitEffect {
                connection_id,
                event_id,
                effect,
                reply,
            } => {
                let result = self.submit_effect(connection_id, event_id, effect).await;
                let _ = reply.send(result);
            }
            RouterCommand::Snapshot { event_id, reply } => {
                let _ = reply.send(self.rooms.get(&event_id).cloned());
            }
        }
    }

    async fn join(
        &mut self,
        connection_id: ConnectionId,
        event_id: EventId,
        role: Role,
    ) -> Result<ParticipantStats, RelayError> {
        if self.store.get_event(event_id).await?.is_none() {
            tracing::warn!(
                "Connection '{}' tried to join unknown {}",
                connection_id,
                event_id
            );
            return Err(RelayError::EventNotFound);
        }

        if let Some(previous) = self.memberships.get(&connection_id).copied()
            && previous != event_id
        {
            tracing::info!(
                "Connection '{}' moves from {} to {}",
                connection_id,
                previous,
                event_id
            );
            self.leave(&connection_id).await?;
        }

        self.store
            .join_session(&connection_id, event_id, role)
            .await?;

        let room = self
            .rooms
            .entry(event_id)
            .or_insert_with(|| RoomState::new(event_id));
        room.admit(connection_id.clone(), role);
        self.memberships.insert(connection_id.clone(), event_id);

        if role == Role::Host {
            tracing::info!("Authorized host of {} is now '{}'", event_id, connection_id);
        }
        tracing::info!("Connection '{}' joined {} as {}", connection_id, event_id, role);

        let joined = ServerMessage::Joined {
            event_id: event_id.value(),
        }
        .to_json()?;
        if let Err(e) = self.message_pusher.push_to(&connection_id, &joined).await {
            tracing::warn!("Failed to acknowledge join to '{}': {}", connection_id, e);
        }

        self.publish_stats(event_id).await
    }

    async fn leave(
        &mut self,
        connection_id: &ConnectionId,
    ) -> Result<Option<ParticipantStats>, RelayError> {
        let Some(event_id) = self.memberships.remove(connection_id) else {
            return Ok(None);
        };

        if let Some(room) = self.rooms.get_mut(&event_id) {
            room.remove(connection_id);
        }
        self.store.leave_session(connection_id).await?;
        tracing::info!("Connection '{}' left {}", connection_id, event_id);

        self.publish_stats(event_id).await.map(Some)
    }

    async fn submit_effect(
        &mut self,
        connection_id: ConnectionId,
        event_id: EventId,
        mut effect: EffectDescriptor,
    ) -> Result<EffectDescriptor, RelayError> {
        let Some(room) = self.rooms.get_mut(&event_id) else {
            tracing::warn!(
                "host_effect from '{}' ignored: {} has no room",
                connection_id,
                event_id
            );
            return Err(RelayError::NotAuthorizedHost);
        };

        if !room.is_authorized_host(&connection_id) {
            tracing::warn!(
                "host_effect from '{}' ignored: authorized host of {} is {:?}",
                connection_id,
                event_id,
                room.authorized_host.as_ref().map(ConnectionId::as_str)
            );
            return Err(RelayError::NotAuthorizedHost);
        }

        if effect.start_at.is_none() {
            effect.start_at =
                Some(self.clock.now_millis() + self.config.default_effect_margin_ms);
        }
        room.record_effect(effect.clone());
        let targets = room.member_ids();
        let target_count = targets.len();

        let json = ServerMessage::Effect {
            effect: effect.clone(),
        }
        .to_json()?;
        if let Err(e) = self.message_pusher.broadcast(targets, &json).await {
            tracing::warn!("Failed to broadcast effect to {}: {}", event_id, e);
        }
        tracing::info!(
            "Broadcasted {} (startAt={:?}) to {} members of {}",
            effect.kind,
            effect.start_at,
            target_count,
            event_id
        );

        Ok(effect)
    }

    /// セッションレコードから参加者数を再計算し、ルームにブロードキャスト
    async fn publish_stats(&self, event_id: EventId) -> Result<ParticipantStats, RelayError> {
        let stats = ParticipantStats {
            active_now: self.store.active_session_count(event_id).await?,
            total_joined: self.store.total_session_count(event_id).await?,
        };

        if let Some(room) = self.rooms.get(&event_id) {
            let update = ServerMessage::ParticipantUpdate {
                active: stats.active_now,
                total: stats.total_joined,
            }
            .to_json()?;
            if let Err(e) = self
                .message_pusher
                .broadcast(room.member_ids(), &update)
                .await
            {
                tracing::warn!("Failed to broadcast participant update to {}: {}", event_id, e);
            }
        }

        Ok(stats)
    }
}
