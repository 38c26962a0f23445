//! UseCase: 時刻同期プローブへの応答
//!
//! ステートレスで、ルーターのキューを経由せずに接続ハンドラから直接呼ばれます。
//! 応答の遅延はそのまま各クライアントのオフセット推定を汚すため、
//! 受信時刻はフレーム受信直後に `received_at` で取得します。

use std::sync::Arc;

use flashcrowd_shared::{protocol::ServerMessage, time::Clock};

pub struct TimeSyncUseCase {
    clock: Arc<dyn Clock>,
}

impl TimeSyncUseCase {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// サーバー時刻（受信時刻の記録用）
    pub fn received_at(&self) -> i64 {
        self.clock.now_millis()
    }

    /// `time_sync_reply` を組み立てる（送信時刻はこの呼び出し時点）
    pub fn reply(&self, client_send_time: i64, server_receive_time: i64) -> ServerMessage {
        ServerMessage::TimeSyncReply {
            client_send_time,
            server_receive_time,
            server_send_time: self.clock.now_millis(),
        }
    }
}
