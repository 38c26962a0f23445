//! Domain logic for client-side operations.
//!
//! Pure functions without side effects, so the reconnect policy can be tested
//! in isolation.

use crate::error::ClientError;

/// Check if the client should exit immediately based on the error type.
///
/// An unknown event will not appear by retrying, so reconnecting is pointless.
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(error, ClientError::EventNotFound)
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The current reconnection attempt count (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts allowed
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    if should_exit_immediately(error) {
        return false;
    }

    current_attempt < max_attempts
}

/// Safety margin added to the host's estimated server time when composing an effect.
///
/// `max(floor, ceil(latency * scale))`
pub fn dispatch_margin_ms(latency_ms: f64, floor_ms: i64, scale: f64) -> i64 {
    let scaled = (latency_ms * scale).ceil();
    if scaled.is_finite() {
        floor_ms.max(scaled as i64)
    } else {
        floor_ms
    }
}
