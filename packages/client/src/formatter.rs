//! Message formatting utilities for client display.

use crate::{output::Capability, time_sync::ClockOffsetEstimate};
use flashcrowd_shared::{
    protocol::{EffectDescriptor, Role},
    time::timestamp_to_rfc3339,
};

const RULE: &str = "============================================================";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Banner shown once the server acknowledged the join
    pub fn format_joined(event_id: u64, role: Role, capability: Capability) -> String {
        format!(
            "\n\n{RULE}\nJoined event {} as {} (output: {})\n{RULE}\n",
            event_id, role, capability
        )
    }

    pub fn format_participant_update(active: usize, total: usize) -> String {
        format!("\n* participants: {} active / {} joined\n", active, total)
    }

    /// Format a received effect
    ///
    /// # Arguments
    ///
    /// * `effect` - The effect as broadcast by the server
    /// * `server_now` - The local estimate of server time when it arrived
    pub fn format_effect(effect: &EffectDescriptor, server_now: i64) -> String {
        let mut details = Vec::new();
        if let Some(color) = &effect.color {
            details.push(format!("color {}", color));
        }
        if let Some(frequency) = effect.frequency {
            details.push(format!("{} Hz", frequency));
        }
        if let Some(duration) = effect.duration {
            details.push(format!("{} ms", duration));
        }
        let details = if details.is_empty() {
            String::new()
        } else {
            format!(" ({})", details.join(", "))
        };

        match effect.start_at {
            Some(start_at) => format!(
                "\n>> {}{} at {} (in {} ms)\n",
                effect.kind,
                details,
                timestamp_to_rfc3339(start_at),
                (start_at - server_now).max(0)
            ),
            None => format!("\n>> {}{} now\n", effect.kind, details),
        }
    }

    pub fn format_status(estimate: Option<ClockOffsetEstimate>, capability: Capability) -> String {
        match estimate {
            Some(estimate) => format!(
                "clock offset {:+.1} ms, latency {:.1} ms, output: {}\n",
                estimate.smoothed_offset_ms, estimate.last_latency_ms, capability
            ),
            None => format!("clock not synced yet, output: {}\n", capability),
        }
    }

    pub fn format_error(message: &str) -> String {
        format!("\n!! server error: {}\n", message)
    }

    pub fn format_torch(on: bool) -> String {
        if on {
            "[torch ON]".to_string()
        } else {
            "[torch off]".to_string()
        }
    }

    pub fn format_screen(color: Option<&str>) -> String {
        match color {
            Some(color) => format!("[screen {}]", color),
            None => "[screen off]".to_string(),
        }
    }

    pub fn format_help(role: Role) -> String {
        match role {
            Role::Host => "commands: on [color] [ms] | off | pulse [color] | strobe [hz] [ms] | \
                           wave <color> [ms] | status\n"
                .to_string(),
            Role::Attendee => "commands: status\n".to_string(),
        }
    }
}
