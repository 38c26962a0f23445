//! UseCase: イベント取得（ID / PIN / 参加者数）

use std::sync::Arc;

use crate::domain::{Event, EventId, EventStore, ParticipantStats};

use super::error::GetEventError;

/// イベント取得のユースケース
pub struct GetEventUseCase {
    store: Arc<dyn EventStore>,
}

impl GetEventUseCase {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    pub async fn by_id(&self, event_id: EventId) -> Result<Event, GetEventError> {
        self.store
            .get_event(event_id)
            .await?
            .ok_or(GetEventError::EventNotFound)
    }

    /// 参加者が入力した PIN からイベントを引く（大文字小文字は区別しない）
    pub async fn by_pin(&self, pin: &str) -> Result<Event, GetEventError> {
        let pin = pin.trim().to_ascii_uppercase();
        self.store
            .get_event_by_pin(&pin)
            .await?
            .ok_or(GetEventError::EventNotFound)
    }

    /// セッションレコードから参加者数を集計する
    pub async fn stats(&self, event_id: EventId) -> Result<ParticipantStats, GetEventError> {
        let event = self.by_id(event_id).await?;
        Ok(ParticipantStats {
            active_now: self.store.active_session_count(event.id).await?,
            total_joined: self.store.total_session_count(event.id).await?,
        })
    }
}
