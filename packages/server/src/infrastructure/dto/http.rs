//! HTTP API request / response DTOs.

use serde::{Deserialize, Serialize};

use flashcrowd_shared::protocol::EffectDescriptor;

/// `POST /api/events` body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub name: String,
    pub host_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    pub id: u64,
    pub pin: String,
    pub name: String,
    pub host_id: String,
    pub is_active: bool,
    /// RFC 3339 (UTC)
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsDto {
    pub active_now: usize,
    pub total_joined: usize,
}

/// `GET /debug/rooms/{id}` response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDebugDto {
    pub event_id: u64,
    pub members: Vec<String>,
    pub authorized_host: Option<String>,
    pub last_effect: Option<EffectDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDto {
    pub error: String,
}

impl ErrorDto {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
