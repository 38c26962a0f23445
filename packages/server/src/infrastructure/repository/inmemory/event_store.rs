//! InMemory Event Store 実装
//!
//! ドメイン層が定義する `EventStore` trait の具体的な実装。
//! イベントとセッションのレコードをプロセス内に保持します。
//!
//! ## PIN の形式
//!
//! 8 桁の数字 + 大文字アルファベット 1 文字（例: `04811297K`）。
//! 乱数は UUID v4 から取り出し、衝突した場合は引き直します。

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    ConnectionId, Event, EventId, EventStore, NewEvent, RepositoryError, Role, Session, Timestamp,
};
use flashcrowd_shared::time::Clock;

/// イベントごとのセッションレコード
#[derive(Default)]
struct EventSessions {
    /// 接続ごとに 1 レコード
    by_connection: HashMap<ConnectionId, Session>,
    /// `is_active` なレコードの数
    active: usize,
}

#[derive(Default)]
struct Records {
    events: BTreeMap<EventId, Event>,
    sessions: HashMap<EventId, EventSessions>,
    /// 接続ごとのアクティブなセッションがあるイベント
    active_events: HashMap<ConnectionId, HashSet<EventId>>,
    last_event_id: u64,
}

/// インメモリ Event Store 実装
pub struct InMemoryEventStore {
    records: Mutex<Records>,
    clock: Arc<dyn Clock>,
}

impl InMemoryEventStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(Records::default()),
            clock,
        }
    }
}

fn generate_pin() -> String {
    let n = Uuid::new_v4().as_u128();
    let digits = n % 100_000_000;
    let letter = char::from(b'A' + ((n >> 64) % 26) as u8);
    format!("{digits:08}{letter}")
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn create_event(&self, new_event: NewEvent) -> Result<Event, RepositoryError> {
        let mut records = self.records.lock().await;

        let pin = loop {
            let candidate = generate_pin();
            if !records.events.values().any(|e| e.pin == candidate) {
                break candidate;
            }
        };

        records.last_event_id += 1;
        let event = Event {
            id: EventId::new(records.last_event_id),
            pin,
            name: new_event.name,
            host_id: new_event.host_id,
            is_active: true,
            created_at: Timestamp::new(self.clock.now_millis()),
        };
        records.events.insert(event.id, event.clone());

        Ok(event)
    }

    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>, RepositoryError> {
        let records = self.records.lock().await;
        Ok(records.events.get(&event_id).cloned())
    }

    async fn get_event_by_pin(&self, pin: &str) -> Result<Option<Event>, RepositoryError> {
        let records = self.records.lock().await;
        Ok(records.events.values().find(|e| e.pin == pin).cloned())
    }

    async fn join_session(
        &self,
        connection_id: &ConnectionId,
        event_id: EventId,
        role: Role,
    ) -> Result<(), RepositoryError> {
        let now = Timestamp::new(self.clock.now_millis());
        let mut guard = self.records.lock().await;
        let records = &mut *guard;

        if !records.events.contains_key(&event_id) {
            return Err(RepositoryError::EventNotFound(event_id.value()));
        }

        let sessions = records.sessions.entry(event_id).or_default();
        match sessions.by_connection.get_mut(connection_id) {
            Some(session) => {
                if !session.is_active {
                    session.is_active = true;
                    sessions.active += 1;
                }
                session.role = role;
            }
            None => {
                sessions.by_connection.insert(
                    connection_id.clone(),
                    Session {
                        connection_id: connection_id.clone(),
                        event_id,
                        role,
                        is_active: true,
                        joined_at: now,
                    },
                );
                sessions.active += 1;
            }
        }
        records
            .active_events
            .entry(connection_id.clone())
            .or_default()
            .insert(event_id);

        Ok(())
    }

    async fn leave_session(&self, connection_id: &ConnectionId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().await;
        let records = &mut *guard;

        let Some(event_ids) = records.active_events.remove(connection_id) else {
            return Ok(());
        };
        for event_id in event_ids {
            if let Some(sessions) = records.sessions.get_mut(&event_id)
                && let Some(session) = sessions.by_connection.get_mut(connection_id)
                && session.is_active
            {
                session.is_active = false;
                sessions.active -= 1;
            }
        }
        Ok(())
    }

    async fn active_session_count(&self, event_id: EventId) -> Result<usize, RepositoryError> {
        let records = self.records.lock().await;
        Ok(records.sessions.get(&event_id).map_or(0, |s| s.active))
    }

    async fn total_session_count(&self, event_id: EventId) -> Result<usize, RepositoryError> {
        let records = self.records.lock().await;
        Ok(records
            .sessions
            .get(&event_id)
            .map_or(0, |s| s.by_connection.len()))
    }
}
