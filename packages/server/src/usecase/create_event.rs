//! UseCase: イベント作成
//!
//! ホストがイベントを作成し、参加者はイベント ID または PIN で参加します。
//! 名前の検証（1〜100 文字）は `EventName` が担い、採番はストアが行います。

use std::sync::Arc;

use crate::domain::{Event, EventName, EventStore, NewEvent};

use super::error::CreateEventError;

/// イベント作成のユースケース
pub struct CreateEventUseCase {
    /// Event ストア（永続化の抽象化）
    store: Arc<dyn EventStore>,
}

impl CreateEventUseCase {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// イベント作成を実行
    ///
    /// # Arguments
    ///
    /// * `name` - イベント名（未検証の入力）
    /// * `host_id` - 作成したホストの匿名 ID
    ///
    /// # Returns
    ///
    /// * `Ok(Event)` - 作成されたイベント（ID と PIN が採番済み）
    /// * `Err(CreateEventError::InvalidInput)` - 名前が不正
    pub async fn execute(&self, name: String, host_id: String) -> Result<Event, CreateEventError> {
        let name = EventName::new(name)?;
        let event = self.store.create_event(NewEvent { name, host_id }).await?;
        tracing::info!(
            "Event '{}' created as {} (pin {})",
            event.name.as_str(),
            event.id,
            event.pin
        );
        Ok(event)
    }
}
