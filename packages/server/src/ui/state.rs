//! Shared application state.

use std::sync::Arc;

use crate::{
    domain::MessagePusher,
    usecase::{CreateEventUseCase, GetEventUseCase, RelayRouter, TimeSyncUseCase},
};

/// Shared application state
pub struct AppState {
    /// RelayRouter（ルーム状態を所有するタスクへのハンドル）
    pub relay_router: RelayRouter,
    /// TimeSyncUseCase（ルーターを経由しない時刻同期応答）
    pub time_sync_usecase: Arc<TimeSyncUseCase>,
    pub create_event_usecase: Arc<CreateEventUseCase>,
    pub get_event_usecase: Arc<GetEventUseCase>,
    /// MessagePusher（接続ごとの送信チャンネル）
    pub message_pusher: Arc<dyn MessagePusher>,
}
