//! 永続化コラボレータのインターフェース
//!
//! イベントとセッションのレコードはコアの外側（KV ストアや RDB）が管理します。
//! コアはこの trait を通してのみアクセスし、具体的な実装は Infrastructure 層が提供します。

use async_trait::async_trait;

use super::{ConnectionId, Event, EventId, NewEvent, RepositoryError};
use flashcrowd_shared::protocol::Role;

/// Event / Session ストアの trait
///
/// ## セッションの扱い
///
/// - セッションは (接続 ID, イベント ID) ごとに 1 レコード
/// - 同じ接続が同じイベントに再参加した場合はレコードを再アクティブ化する（total は増えない）
/// - 退出時は削除せず `is_active = false` にする（total は減らない）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventStore: Send + Sync {
    /// イベントを作成（ID と PIN はストアが採番する）
    async fn create_event(&self, new_event: NewEvent) -> Result<Event, RepositoryError>;

    /// ID でイベントを取得
    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>, RepositoryError>;

    /// PIN でイベントを取得
    async fn get_event_by_pin(&self, pin: &str) -> Result<Option<Event>, RepositoryError>;

    /// セッションを記録（既存なら再アクティブ化）
    async fn join_session(
        &self,
        connection_id: &ConnectionId,
        event_id: EventId,
        role: Role,
    ) -> Result<(), RepositoryError>;

    /// 接続の全セッションを非アクティブにする
    async fn leave_session(&self, connection_id: &ConnectionId) -> Result<(), RepositoryError>;

    /// アクティブなセッション数
    async fn active_session_count(&self, event_id: EventId) -> Result<usize, RepositoryError>;

    /// これまでに参加したセッションの総数
    async fn total_session_count(&self, event_id: EventId) -> Result<usize, RepositoryError>;
}
