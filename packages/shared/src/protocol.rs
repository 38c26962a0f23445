//! WebSocket wire protocol.
//!
//! Every frame is a JSON object tagged by `type` (snake_case). Field names are
//! camelCase so that browser and mobile clients can share the format.
//!
//! ```text
//! client -> server: join_event, host_effect, time_sync, leave_event
//! server -> client: joined, participant_update, effect, time_sync_reply, error
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Kind of light effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectType {
    TorchOn,
    TorchOff,
    Strobe,
    Pulse,
    ColorWave,
}

impl fmt::Display for EffectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EffectType::TorchOn => "TORCH_ON",
            EffectType::TorchOff => "TORCH_OFF",
            EffectType::Strobe => "STROBE",
            EffectType::Pulse => "PULSE",
            EffectType::ColorWave => "COLOR_WAVE",
        };
        f.write_str(name)
    }
}

/// A timed light instruction broadcast to a room.
///
/// `start_at` is an absolute server timestamp (epoch milliseconds). The host
/// normally sets it; the relay fills it in when it is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectDescriptor {
    #[serde(rename = "type")]
    pub kind: EffectType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_at: Option<i64>,
    /// Duration in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Strobe frequency in Hz
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    /// Screen flash colour (e.g. `#FF0000`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl EffectDescriptor {
    /// Create a descriptor with no start time and no options
    pub fn new(kind: EffectType) -> Self {
        Self {
            kind,
            start_at: None,
            duration: None,
            frequency: None,
            color: None,
        }
    }

    pub fn with_start_at(mut self, start_at: i64) -> Self {
        self.start_at = Some(start_at);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration = Some(duration_ms);
        self
    }

    pub fn with_frequency(mut self, frequency_hz: f64) -> Self {
        self.frequency = Some(frequency_hz);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Role a connection plays in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Attendee,
}

impl Role {
    /// Lenient conversion used for connection query parameters:
    /// anything other than `host` is an attendee.
    pub fn from_query(value: &str) -> Self {
        if value.eq_ignore_ascii_case("host") {
            Role::Host
        } else {
            Role::Attendee
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Attendee => "attendee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "host" => Ok(Role::Host),
            "attendee" => Ok(Role::Attendee),
            other => Err(format!("unknown role '{}' (expected host or attendee)", other)),
        }
    }
}

/// Messages sent by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    JoinEvent { event_id: u64, role: Role },
    #[serde(rename_all = "camelCase")]
    HostEffect {
        event_id: u64,
        effect: EffectDescriptor,
    },
    #[serde(rename_all = "camelCase")]
    TimeSync { client_send_time: i64 },
    LeaveEvent,
}

/// Messages sent by the relay server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    Joined { event_id: u64 },
    ParticipantUpdate { active: usize, total: usize },
    Effect { effect: EffectDescriptor },
    #[serde(rename_all = "camelCase")]
    TimeSyncReply {
        client_send_time: i64,
        server_receive_time: i64,
        server_send_time: i64,
    },
    Error { message: String },
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
