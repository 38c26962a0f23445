//! ドメイン層
//!
//! エンティティ、値オブジェクト、および外部コラボレータ（永続化・メッセージ送信）の
//! インターフェースを定義します。

pub mod entity;
pub mod error;
pub mod message_pusher;
pub mod repository;
pub mod value_object;

pub use entity::{Event, NewEvent, ParticipantStats, RoomState, Session};
pub use error::{MessagePushError, RepositoryError, ValueObjectError};
pub use message_pusher::{MessagePusher, PusherChannel};
pub use repository::EventStore;
pub use value_object::{ConnectionId, EventId, EventName, Timestamp};

// ワイヤープロトコルの型はドメインでもそのまま扱う
pub use flashcrowd_shared::protocol::{EffectDescriptor, EffectType, Role};
