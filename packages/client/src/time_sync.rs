//! Clock offset estimation against the relay server.
//!
//! Each probe measures one round trip:
//!
//! ```text
//! rtt        = local_receive - local_send
//! latency    = rtt / 2
//! raw_offset = server_receive_time - (local_send + latency)
//! smoothed   = smoothed * α + raw_offset * (1 - α)
//! ```
//!
//! The first sample seeds the estimate directly. Until then the offset is 0.

use std::sync::Arc;

use flashcrowd_shared::{protocol::ClientMessage, time::Clock};

pub const DEFAULT_SMOOTHING: f64 = 0.8;
pub const MIN_SMOOTHING: f64 = 0.6;
pub const MAX_SMOOTHING: f64 = 0.8;

/// Current offset estimate of one connection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockOffsetEstimate {
    /// `server_time - local_time`, exponentially smoothed
    pub smoothed_offset_ms: f64,
    /// One-way latency of the last accepted round trip
    pub last_latency_ms: f64,
}

pub struct TimeSyncEstimator {
    clock: Arc<dyn Clock>,
    smoothing: f64,
    estimate: Option<ClockOffsetEstimate>,
    /// Local send time of the probe awaiting its reply
    pending_probe: Option<i64>,
}

impl TimeSyncEstimator {
    /// `smoothing` is clamped into `[0.6, 0.8]`; a non-finite value uses the default.
    pub fn new(clock: Arc<dyn Clock>, smoothing: f64) -> Self {
        let smoothing = if smoothing.is_finite() {
            smoothing.clamp(MIN_SMOOTHING, MAX_SMOOTHING)
        } else {
            DEFAULT_SMOOTHING
        };
        Self {
            clock,
            smoothing,
            estimate: None,
            pending_probe: None,
        }
    }

    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }

    /// Start a new round and return the probe to send.
    ///
    /// A probe still awaiting its reply is abandoned.
    pub fn begin_probe(&mut self) -> ClientMessage {
        let client_send_time = self.clock.now_millis();
        if let Some(lost) = self.pending_probe.replace(client_send_time) {
            tracing::debug!("Time sync probe sent at {} got no reply, skipping", lost);
        }
        ClientMessage::TimeSync { client_send_time }
    }

    /// Feed a `time_sync_reply`.
    ///
    /// Returns the updated estimate, or `None` when the reply was discarded
    /// (not the outstanding probe, or the local clock stepped backwards).
    pub fn record_reply(
        &mut self,
        client_send_time: i64,
        server_receive_time: i64,
    ) -> Option<ClockOffsetEstimate> {
        if self.pending_probe != Some(client_send_time) {
            tracing::debug!(
                "Discarding time sync reply for probe {} (outstanding: {:?})",
                client_send_time,
                self.pending_probe
            );
            return None;
        }
        self.pending_probe = None;

        let local_receive = self.clock.now_millis();
        if local_receive < client_send_time {
            tracing::warn!(
                "Discarding time sync reply with negative round trip ({} ms)",
                local_receive - client_send_time
            );
            return None;
        }

        Some(self.apply_sample(client_send_time, local_receive, server_receive_time))
    }

    /// Fold one measured round trip into the estimate
    pub fn apply_sample(
        &mut self,
        local_send: i64,
        local_receive: i64,
        server_receive_time: i64,
    ) -> ClockOffsetEstimate {
        let latency = (local_receive - local_send) as f64 / 2.0;
        let raw_offset = server_receive_time as f64 - (local_send as f64 + latency);

        let smoothed_offset_ms = match self.estimate {
            Some(previous) => {
                previous.smoothed_offset_ms * self.smoothing + raw_offset * (1.0 - self.smoothing)
            }
            None => raw_offset,
        };

        let estimate = ClockOffsetEstimate {
            smoothed_offset_ms,
            last_latency_ms: latency,
        };
        self.estimate = Some(estimate);
        tracing::debug!(
            "Clock offset {:.1} ms (raw {:.1} ms, latency {:.1} ms)",
            smoothed_offset_ms,
            raw_offset,
            latency
        );
        estimate
    }

    /// Estimated server time in epoch milliseconds
    pub fn now(&self) -> i64 {
        self.clock.now_millis() + self.offset_ms().round() as i64
    }

    pub fn offset_ms(&self) -> f64 {
        self.estimate.map_or(0.0, |e| e.smoothed_offset_ms)
    }

    pub fn estimated_latency_ms(&self) -> f64 {
        self.estimate.map_or(0.0, |e| e.last_latency_ms)
    }

    pub fn is_synced(&self) -> bool {
        self.estimate.is_some()
    }

    pub fn estimate(&self) -> Option<ClockOffsetEstimate> {
        self.estimate
    }
}
