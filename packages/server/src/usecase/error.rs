//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{RepositoryError, ValueObjectError};

/// リレー処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// 参加先のイベントが存在しない（要求元にのみ通知する）
    #[error("Event not found")]
    EventNotFound,

    /// 送信者がルームの authorized host ではない（ログのみ、通知しない）
    #[error("connection is not the authorized host of the room")]
    NotAuthorizedHost,

    /// ルーターのタスクが停止している
    #[error("relay router is not running")]
    RouterUnavailable,

    #[error("failed to encode message: {0}")]
    Serialization(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// イベント作成のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateEventError {
    #[error(transparent)]
    InvalidInput(#[from] ValueObjectError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// イベント取得のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetEventError {
    #[error("Event not found")]
    EventNotFound,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Serialization(err.to_string())
    }
}
