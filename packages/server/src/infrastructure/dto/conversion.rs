//! Conversion logic between domain entities and DTOs.

use crate::domain::entity;
use crate::infrastructure::dto::http as dto;
use flashcrowd_shared::time::timestamp_to_rfc3339;

// ========================================
// Domain Entity → DTO
// ========================================

impl From<entity::Event> for dto::EventDto {
    fn from(model: entity::Event) -> Self {
        Self {
            id: model.id.value(),
            pin: model.pin,
            name: model.name.into_string(),
            host_id: model.host_id,
            is_active: model.is_active,
            created_at: timestamp_to_rfc3339(model.created_at.value()),
        }
    }
}

impl From<entity::ParticipantStats> for dto::StatsDto {
    fn from(model: entity::ParticipantStats) -> Self {
        Self {
            active_now: model.active_now,
            total_joined: model.total_joined,
        }
    }
}

impl From<entity::RoomState> for dto::RoomDebugDto {
    fn from(model: entity::RoomState) -> Self {
        Self {
            event_id: model.event_id.value(),
            members: model
                .members
                .into_iter()
                .map(|id| id.into_string())
                .collect(),
            authorized_host: model.authorized_host.map(|id| id.into_string()),
            last_effect: model.last_effect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ConnectionId, EffectDescriptor, EffectType, EventId, EventName, Role, Timestamp,
    };

    #[test]
    fn test_domain_event_to_dto() {
        // テスト項目: Event が EventDto に変換され、作成時刻は RFC 3339 になる
        // given (前提条件):
        let event = entity::Event {
            id: EventId::new(3),
            pin: "00000042Z".to_string(),
            name: EventName::new("Night Show".to_string()).unwrap(),
            host_id: "host-1".to_string(),
            is_active: true,
            created_at: Timestamp::new(0),
        };

        // when (操作):
        let dto: dto::EventDto = event.into();

        // then (期待する結果):
        assert_eq!(dto.id, 3);
        assert_eq!(dto.pin, "00000042Z");
        assert_eq!(dto.name, "Night Show");
        assert_eq!(dto.created_at, "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_stats_dto_uses_camel_case() {
        // テスト項目: StatsDto は activeNow / totalJoined として出力される
        // given (前提条件):
        let stats = entity::ParticipantStats {
            active_now: 4,
            total_joined: 9,
        };

        // when (操作):
        let json = serde_json::to_value(dto::StatsDto::from(stats)).unwrap();

        // then (期待する結果):
        assert_eq!(json, serde_json::json!({"activeNow": 4, "totalJoined": 9}));
    }

    #[test]
    fn test_room_state_to_debug_dto() {
        // テスト項目: RoomState のメンバー・host・最後のエフェクトが DTO に反映される
        // given (前提条件):
        let host = ConnectionId::new("host".to_string()).unwrap();
        let mut room = entity::RoomState::new(EventId::new(1));
        room.admit(host, Role::Host);
        room.record_effect(EffectDescriptor::new(EffectType::TorchOn).with_start_at(5));

        // when (操作):
        let dto: dto::RoomDebugDto = room.into();

        // then (期待する結果):
        assert_eq!(dto.members, vec!["host".to_string()]);
        assert_eq!(dto.authorized_host.as_deref(), Some("host"));
        assert_eq!(dto.last_effect.map(|e| e.kind), Some(EffectType::TorchOn));
    }
}
