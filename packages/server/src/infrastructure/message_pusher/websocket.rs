//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの `UnboundedSender` を `ConnectionId` で管理
//! - 特定の接続への送信（push_to）とルームメンバーへの送信（broadcast）
//!
//! WebSocket の受け付けと sender の生成は UI 層（`ui/handler/websocket.rs`）で行い、
//! ここでは生成済みの sender を使って送信するだけです。
//! 接続ごとのチャンネルは FIFO なので、同じ接続へのメッセージは送信順に届きます。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel};

/// WebSocket を使った MessagePusher 実装
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// 接続中のクライアントの WebSocket sender
    clients: Mutex<HashMap<ConnectionId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登録中の接続数
    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
        clients.insert(connection_id, sender);
    }

    async fn unregister_client(&self, connection_id: &ConnectionId) {
        let mut clients = self.clients.lock().await;
        clients.remove(connection_id);
        tracing::debug!(
            "Connection '{}' unregistered from MessagePusher",
            connection_id
        );
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        let Some(sender) = clients.get(connection_id) else {
            return Err(MessagePushError::ClientNotFound(
                connection_id.as_str().to_string(),
            ));
        };
        sender
            .send(content.to_string())
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::debug!("Pushed message to connection '{}'", connection_id);
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        for target in targets {
            match clients.get(&target) {
                // ブロードキャストでは一部の送信失敗を許容
                Some(sender) => {
                    if let Err(e) = sender.send(content.to_string()) {
                        tracing::warn!("Failed to push message to connection '{}': {}", target, e);
                    }
                }
                None => {
                    tracing::warn!(
                        "Connection '{}' not found during broadcast, skipping",
                        target
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - push_to: 特定の接続への送信
    // - broadcast: 複数接続への送信（一部の失敗は許容）
    // - unregister 後は送信対象にならないこと
    // ========================================

    fn conn(id: &str) -> ConnectionId {
        ConnectionId::new(id.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_push_to_success() {
        // テスト項目: 登録済みの接続にメッセージを送信できる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        pusher.register_client(conn("alice"), tx).await;

        // when (操作):
        let result = pusher.push_to(&conn("alice"), "Hello").await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(rx.recv().await, Some("Hello".to_string()));
    }

    #[tokio::test]
    async fn test_push_to_client_not_found() {
        // テスト項目: 未登録の接続への送信は ClientNotFound になる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();

        // when (操作):
        let result = pusher.push_to(&conn("nonexistent"), "Hello").await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(MessagePushError::ClientNotFound("nonexistent".to_string()))
        );
    }

    #[tokio::test]
    async fn test_push_to_closed_channel_fails() {
        // テスト項目: 受信側が閉じた接続への送信は PushFailed になる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx, rx) = mpsc::unbounded_channel();
        pusher.register_client(conn("alice"), tx).await;
        drop(rx);

        // when (操作):
        let result = pusher.push_to(&conn("alice"), "Hello").await;

        // then (期待する結果):
        assert!(matches!(result, Err(MessagePushError::PushFailed(_))));
    }

    #[tokio::test]
    async fn test_broadcast_skips_missing_targets() {
        // テスト項目: ブロードキャストは未登録の接続をスキップし、成功扱いになる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        pusher.register_client(conn("alice"), tx1).await;
        pusher.register_client(conn("bob"), tx2).await;

        // when (操作):
        let targets = vec![conn("alice"), conn("ghost"), conn("bob")];
        let result = pusher.broadcast(targets, "Broadcast message").await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(rx1.recv().await, Some("Broadcast message".to_string()));
        assert_eq!(rx2.recv().await, Some("Broadcast message".to_string()));
    }

    #[tokio::test]
    async fn test_unregister_client() {
        // テスト項目: 登録解除した接続には送信されない
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        pusher.register_client(conn("alice"), tx).await;

        // when (操作):
        pusher.unregister_client(&conn("alice")).await;

        // then (期待する結果):
        assert_eq!(pusher.client_count().await, 0);
        assert!(pusher.push_to(&conn("alice"), "Hello").await.is_err());
    }
}
