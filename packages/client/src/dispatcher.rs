//! Host-side effect dispatch.
//!
//! The host stamps each effect with `startAt = estimated server time + margin`,
//! applies it through its own scheduler first and then submits it to the relay.
//! Local application never waits for the server.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::{
    domain::dispatch_margin_ms, scheduler::EffectScheduler, time_sync::TimeSyncEstimator,
};
use flashcrowd_shared::protocol::{ClientMessage, EffectDescriptor};

/// Outbound queue of the current connection
pub type Outbound = mpsc::UnboundedSender<ClientMessage>;

pub struct EffectDispatcher {
    event_id: u64,
    estimator: Arc<Mutex<TimeSyncEstimator>>,
    scheduler: Arc<Mutex<EffectScheduler>>,
    outbound: Option<Outbound>,
    margin_floor_ms: i64,
    margin_scale: f64,
}

impl EffectDispatcher {
    pub fn new(
        event_id: u64,
        estimator: Arc<Mutex<TimeSyncEstimator>>,
        scheduler: Arc<Mutex<EffectScheduler>>,
        margin_floor_ms: i64,
        margin_scale: f64,
    ) -> Self {
        Self {
            event_id,
            estimator,
            scheduler,
            outbound: None,
            margin_floor_ms,
            margin_scale,
        }
    }

    pub fn connect(&mut self, outbound: Outbound) {
        self.outbound = Some(outbound);
    }

    /// Stamp, apply locally and submit `effect`.
    ///
    /// Returns the dispatched effect, or `None` when there is no live
    /// connection (nothing is applied in that case).
    pub async fn dispatch(&self, effect: EffectDescriptor) -> Option<EffectDescriptor> {
        let Some(outbound) = self.outbound.as_ref().filter(|tx| !tx.is_closed()) else {
            tracing::info!("No active connection, {} not dispatched", effect.kind);
            return None;
        };

        let (server_now, latency_ms) = {
            let estimator = self.estimator.lock().await;
            (estimator.now(), estimator.estimated_latency_ms())
        };
        let margin_ms = dispatch_margin_ms(latency_ms, self.margin_floor_ms, self.margin_scale);
        let effect = effect.with_start_at(server_now + margin_ms);

        self.scheduler
            .lock()
            .await
            .schedule(effect.clone(), server_now)
            .await;

        let message = ClientMessage::HostEffect {
            event_id: self.event_id,
            effect: effect.clone(),
        };
        if outbound.send(message).is_err() {
            tracing::warn!("Connection closed before {} was submitted", effect.kind);
        } else {
            tracing::info!(
                "Dispatched {} with startAt={} (margin {} ms)",
                effect.kind,
                server_now + margin_ms,
                margin_ms
            );
        }

        Some(effect)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        output::{LightOutput, testing::RecordingScreen},
        time_sync::DEFAULT_SMOOTHING,
    };
    use flashcrowd_shared::{
        protocol::EffectType,
        time::{Clock, ManualClock},
    };

    const LOCAL_NOW: i64 = 1_000_000;

    struct Fixture {
        dispatcher: EffectDispatcher,
        estimator: Arc<Mutex<TimeSyncEstimator>>,
        screen: RecordingScreen,
    }

    fn fixture() -> Fixture {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(LOCAL_NOW));
        let estimator = Arc::new(Mutex::new(TimeSyncEstimator::new(
            clock,
            DEFAULT_SMOOTHING,
        )));
        let screen = RecordingScreen::default();
        let output = LightOutput::new(None, Box::new(screen.clone()));
        let scheduler = Arc::new(Mutex::new(EffectScheduler::new(Arc::new(Mutex::new(
            output,
        )))));
        let dispatcher = EffectDispatcher::new(42, estimator.clone(), scheduler, 150, 1.2);
        Fixture {
            dispatcher,
            estimator,
            screen,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_without_connection_is_noop() {
        // テスト項目: 接続がない場合は何も適用・送信されない
        // given (前提条件):
        let fixture = fixture();

        // when (操作):
        let result = fixture
            .dispatcher
            .dispatch(EffectDescriptor::new(EffectType::Pulse))
            .await;
        tokio::time::sleep(Duration::from_millis(1_000)).await;

        // then (期待する結果):
        assert_eq!(result, None);
        assert!(fixture.screen.flashes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_stamps_start_and_submits() {
        // テスト項目: startAt = 推定サーバー時刻 + マージンが付与され、host_effect として送信される
        // given (前提条件): オフセット +5000ms, 遅延 200ms → マージン ceil(240) = 240
        let mut fixture = fixture();
        fixture
            .estimator
            .lock()
            .await
            .apply_sample(LOCAL_NOW - 400, LOCAL_NOW, LOCAL_NOW + 4_800);
        let (tx, mut rx) = mpsc::unbounded_channel();
        fixture.dispatcher.connect(tx);

        // when (操作):
        let effect = fixture
            .dispatcher
            .dispatch(EffectDescriptor::new(EffectType::TorchOn).with_duration(1_000))
            .await
            .unwrap();

        // then (期待する結果):
        let expected_start = LOCAL_NOW + 5_000 + 240;
        assert_eq!(effect.start_at, Some(expected_start));
        assert_eq!(
            rx.try_recv().unwrap(),
            ClientMessage::HostEffect {
                event_id: 42,
                effect: effect.clone()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_applies_locally_with_margin_delay() {
        // テスト項目: ホスト自身の出力もマージン後に点灯する（サーバーの応答を待たない）
        // given (前提条件): 未同期なのでオフセット 0、マージンは下限の 150ms
        let mut fixture = fixture();
        let (tx, _rx) = mpsc::unbounded_channel();
        fixture.dispatcher.connect(tx);
        let origin = tokio::time::Instant::now();

        // when (操作):
        fixture
            .dispatcher
            .dispatch(EffectDescriptor::new(EffectType::Pulse))
            .await;
        tokio::time::sleep(Duration::from_millis(1_000)).await;

        // then (期待する結果):
        let flashes = fixture.screen.flashes();
        assert_eq!(flashes.len(), 2);
        assert_eq!((flashes[0].at - origin).as_millis(), 150);
        assert_eq!((flashes[1].at - origin).as_millis(), 350);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_after_connection_closed_is_noop() {
        // テスト項目: 送信先のチャンネルが閉じていれば接続なしとして扱う
        // given (前提条件):
        let mut fixture = fixture();
        let (tx, rx) = mpsc::unbounded_channel();
        fixture.dispatcher.connect(tx);
        drop(rx);

        // when (操作):
        let result = fixture
            .dispatcher
            .dispatch(EffectDescriptor::new(EffectType::TorchOff))
            .await;

        // then (期待する結果):
        assert_eq!(result, None);
    }
}
