//! Client runtime configuration.

use std::time::Duration;

use flashcrowd_shared::protocol::Role;

pub const DEFAULT_URL: &str = "ws://127.0.0.1:8080/ws";
pub const DEFAULT_SYNC_INTERVAL_MS: u64 = 1_500;
pub const MIN_SYNC_INTERVAL_MS: u64 = 1_500;
pub const MAX_SYNC_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_MARGIN_FLOOR_MS: i64 = 150;
pub const DEFAULT_MARGIN_SCALE: f64 = 1.2;

/// Settings of one client process, shared by every reconnect attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// WebSocket endpoint of the relay (`ws://host:port/ws`)
    pub url: String,
    pub event_id: u64,
    pub role: Role,
    /// Period between time-sync probes
    pub sync_interval: Duration,
    /// EMA weight of the previous offset estimate
    pub smoothing: f64,
    /// Lower bound of the host dispatch margin
    pub margin_floor_ms: i64,
    /// Multiplier applied to the estimated latency for the dispatch margin
    pub margin_scale: f64,
    /// Try the device torch before falling back to the screen
    pub torch_enabled: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            event_id: 1,
            role: Role::Attendee,
            sync_interval: Duration::from_millis(DEFAULT_SYNC_INTERVAL_MS),
            smoothing: crate::time_sync::DEFAULT_SMOOTHING,
            margin_floor_ms: DEFAULT_MARGIN_FLOOR_MS,
            margin_scale: DEFAULT_MARGIN_SCALE,
            torch_enabled: true,
        }
    }
}

impl ClientConfig {
    /// Sync interval clamped into the supported 1500-2000 ms range
    pub fn with_sync_interval_ms(mut self, interval_ms: u64) -> Self {
        self.sync_interval =
            Duration::from_millis(interval_ms.clamp(MIN_SYNC_INTERVAL_MS, MAX_SYNC_INTERVAL_MS));
        self
    }
}
