//! UseCase 層
//!
//! - `relay_router`: ルーム状態を単一タスクで所有するリレー（join / leave / effect）
//! - `time_sync`: 時刻同期プローブへの即時応答
//! - `create_event` / `get_event`: 永続化コラボレータへの薄いアダプタ

mod create_event;
mod error;
mod get_event;
mod relay_router;
mod time_sync;

pub use create_event::CreateEventUseCase;
pub use error::{CreateEventError, GetEventError, RelayError};
pub use get_event::GetEventUseCase;
pub use relay_router::{RelayConfig, RelayRouter};
pub use time_sync::TimeSyncUseCase;
