//! Effect scheduling.
//!
//! Converts an effect's absolute server-time `startAt` into a local delay and
//! arms one cancellable task per effect. At most one effect is live: scheduling
//! a new one cancels the previous one first.
//!
//! | effect       | behaviour at fire time                                     |
//! |--------------|------------------------------------------------------------|
//! | `TORCH_OFF`  | immediate, never delayed                                   |
//! | `TORCH_ON`   | on, held for `min(duration, 60 s)`, then off               |
//! | `COLOR_WAVE` | same as `TORCH_ON`, with the effect colour                 |
//! | `PULSE`      | on, off after 200 ms                                       |
//! | `STROBE`     | toggles every `1000 / f / 2` ms, off after `duration`      |

use std::{collections::VecDeque, sync::Arc, time::Duration};

use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{Instant, sleep, sleep_until},
};

use crate::output::LightOutput;
use flashcrowd_shared::protocol::{EffectDescriptor, EffectType};

/// Thermal safety bound for sustained effects
pub const MAX_SUSTAIN_MS: u64 = 60_000;
pub const PULSE_MS: u64 = 200;
pub const DEFAULT_STROBE_DURATION_MS: u64 = 10_000;
pub const DEFAULT_STROBE_HZ: f64 = 5.0;
pub const MAX_STROBE_HZ: f64 = 25.0;
/// Number of consumed descriptors remembered for echo suppression
const CONSUMED_HISTORY: usize = 32;

/// Timeline of one effect, resolved from its descriptor
#[derive(Debug, Clone, PartialEq)]
enum EffectPlan {
    Sustain {
        color: Option<String>,
        hold: Duration,
    },
    Pulse {
        color: Option<String>,
    },
    Strobe {
        color: Option<String>,
        half_cycle: Duration,
        duration: Duration,
    },
}

impl EffectPlan {
    /// `None` for effects that are applied immediately (`TORCH_OFF`)
    fn from_descriptor(effect: &EffectDescriptor) -> Option<Self> {
        let color = effect.color.clone();
        match effect.kind {
            EffectType::TorchOff => None,
            EffectType::TorchOn | EffectType::ColorWave => Some(EffectPlan::Sustain {
                color,
                hold: Duration::from_millis(
                    effect.duration.unwrap_or(MAX_SUSTAIN_MS).min(MAX_SUSTAIN_MS),
                ),
            }),
            EffectType::Pulse => Some(EffectPlan::Pulse { color }),
            EffectType::Strobe => Some(EffectPlan::Strobe {
                color,
                half_cycle: strobe_half_cycle(effect.frequency),
                duration: Duration::from_millis(
                    effect
                        .duration
                        .unwrap_or(DEFAULT_STROBE_DURATION_MS)
                        .min(MAX_SUSTAIN_MS),
                ),
            }),
        }
    }
}

/// Half of one strobe period.
///
/// Non-finite or non-positive frequencies fall back to 5 Hz; anything above
/// 25 Hz is clamped.
fn strobe_half_cycle(frequency: Option<f64>) -> Duration {
    let hz = match frequency {
        Some(f) if f.is_finite() && f > 0.0 => f.min(MAX_STROBE_HZ),
        Some(f) => {
            tracing::warn!("Invalid strobe frequency {}, using {} Hz", f, DEFAULT_STROBE_HZ);
            DEFAULT_STROBE_HZ
        }
        None => DEFAULT_STROBE_HZ,
    };
    Duration::from_secs_f64(1.0 / hz / 2.0)
}

struct ActiveEffect {
    effect: EffectDescriptor,
    task: JoinHandle<()>,
}

pub struct EffectScheduler {
    output: Arc<Mutex<LightOutput>>,
    active: Option<ActiveEffect>,
    /// Recently consumed descriptors that carried a `startAt`, oldest first
    consumed: VecDeque<EffectDescriptor>,
}

impl EffectScheduler {
    pub fn new(output: Arc<Mutex<LightOutput>>) -> Self {
        Self {
            output,
            active: None,
            consumed: VecDeque::with_capacity(CONSUMED_HISTORY),
        }
    }

    pub fn output(&self) -> &Arc<Mutex<LightOutput>> {
        &self.output
    }

    /// Arm `effect` relative to the estimated server time `server_now`.
    ///
    /// `delay = max(0, startAt - server_now)`; an effect without `startAt`
    /// fires immediately.
    ///
    /// A descriptor with a `startAt` is consumed once: a later delivery of the
    /// same one (a host's own effect echoed back by the relay, possibly after
    /// newer effects) is ignored.
    pub async fn schedule(&mut self, effect: EffectDescriptor, server_now: i64) {
        if !self.consume(&effect) {
            tracing::debug!("{} already consumed, ignoring duplicate", effect.kind);
            return;
        }
        self.cancel_active().await;

        let Some(plan) = EffectPlan::from_descriptor(&effect) else {
            self.output.lock().await.set(false, None);
            tracing::debug!("{} applied immediately", effect.kind);
            return;
        };

        let delay_ms = effect
            .start_at
            .map_or(0, |start_at| (start_at - server_now).max(0) as u64);
        tracing::debug!("{} armed to fire in {} ms", effect.kind, delay_ms);

        let task = tokio::spawn(run_effect(
            self.output.clone(),
            plan,
            Duration::from_millis(delay_ms),
        ));
        self.active = Some(ActiveEffect { effect, task });
    }

    /// Remember `effect`; `false` when it was consumed before
    fn consume(&mut self, effect: &EffectDescriptor) -> bool {
        if effect.start_at.is_none() {
            return true;
        }
        if self.consumed.contains(effect) {
            return false;
        }
        if self.consumed.len() == CONSUMED_HISTORY {
            self.consumed.pop_front();
        }
        self.consumed.push_back(effect.clone());
        true
    }

    /// Whether an armed or running effect exists
    pub fn has_active_effect(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }

    /// Cancel pending timers and force the output off
    pub async fn shutdown(&mut self) {
        self.cancel_active().await;
        self.output.lock().await.set(false, None);
    }

    /// Cancel the live effect. Idempotent.
    ///
    /// A transient effect (pulse, strobe) cut while lit gets its off transition,
    /// so every on is paired with an off.
    async fn cancel_active(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        active.task.abort();
        // Wait until the task has really stopped touching the output
        let _ = active.task.await;

        if matches!(active.effect.kind, EffectType::Pulse | EffectType::Strobe) {
            self.output.lock().await.set(false, None);
        }
    }
}

impl Drop for EffectScheduler {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.task.abort();
        }
        match self.output.try_lock() {
            Ok(mut output) => output.set(false, None),
            Err(_) => tracing::warn!("Output busy while dropping scheduler, left as is"),
        }
    }
}

async fn run_effect(output: Arc<Mutex<LightOutput>>, plan: EffectPlan, delay: Duration) {
    if !delay.is_zero() {
        sleep(delay).await;
    }

    match plan {
        EffectPlan::Sustain { color, hold } => {
            output.lock().await.set(true, color.as_deref());
            sleep(hold).await;
            output.lock().await.set(false, None);
        }
        EffectPlan::Pulse { color } => {
            output.lock().await.set(true, color.as_deref());
            sleep(Duration::from_millis(PULSE_MS)).await;
            output.lock().await.set(false, None);
        }
        EffectPlan::Strobe {
            color,
            half_cycle,
            duration,
        } => {
            let started = Instant::now();
            let deadline = started + duration;
            let mut next = started;
            let mut lit = true;
            loop {
                output.lock().await.set(lit, color.as_deref());
                next += half_cycle;
                if next >= deadline {
                    break;
                }
                sleep_until(next).await;
                lit = !lit;
            }
            sleep_until(deadline).await;
            output.lock().await.set(false, None);
        }
    }
}
