//! 주기 샘플링 스케줄러.
//!
//! 주기(기본 1시간)와 시작 시 한 번 정한 위상 오프셋(0~59분 중 임의의 정수 분)으로
//! 다음 틱 시각을 정한다. 틱은 겹치지 않으며, 대기 중 종료 신호를 받으면 즉시 반환한다.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::sampler::{Record, Sampler, SamplingMode};

/// 위상 오프셋 후보 범위 (분)
const OFFSET_MINUTES: u64 = 60;

/// 틱 시각 계산기
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSchedule {
    period_ms: i64,
    offset_ms: i64,
}

impl TickSchedule {
    /// 주기와 위상 오프셋으로 생성 (주기 최소 1ms)
    pub fn new(period: Duration, offset: Duration) -> Self {
        let period_ms = i64::try_from(period.as_millis()).unwrap_or(i64::MAX).max(1);
        let offset_ms = i64::try_from(offset.as_millis()).unwrap_or(0);
        Self {
            period_ms,
            offset_ms,
        }
    }

    /// 임의의 정수 분 오프셋으로 생성
    pub fn randomized(period: Duration) -> Self {
        let minutes = rand::random_range(0..OFFSET_MINUTES);
        Self::new(period, Duration::from_secs(minutes * 60))
    }

    /// 위상 오프셋
    pub fn offset(&self) -> Duration {
        Duration::from_millis(self.offset_ms as u64)
    }

    /// `now_ms`(epoch 밀리초)에서 다음 틱까지 대기 시간
    ///
    /// `period - ((now - offset) mod period)`, 항상 `(0, period]`.
    pub fn delay_until_next(&self, now_ms: i64) -> Duration {
        let elapsed = (now_ms - self.offset_ms).rem_euclid(self.period_ms);
        Duration::from_millis((self.period_ms - elapsed) as u64)
    }
}

/// 주기 스케줄러
pub struct Scheduler {
    sampler: Arc<Sampler>,
    schedule: TickSchedule,
    output: mpsc::Sender<Record>,
}

impl Scheduler {
    pub fn new(sampler: Arc<Sampler>, schedule: TickSchedule, output: mpsc::Sender<Record>) -> Self {
        Self {
            sampler,
            schedule,
            output,
        }
    }

    /// 종료 신호까지 틱 반복
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            "스케줄러 시작: 주기 {}ms, 오프셋 {}분",
            self.schedule.period_ms,
            self.schedule.offset().as_secs() / 60
        );

        loop {
            let delay = self.schedule.delay_until_next(Utc::now().timestamp_millis());
            debug!("다음 틱까지 {}ms", delay.as_millis());

            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    let Some(record) = self.sampler.execute(SamplingMode::Scheduled).await else {
                        continue;
                    };
                    if self.output.send(record).await.is_err() {
                        warn!("출력 채널 닫힘: 스케줄러 종료");
                        break;
                    }
                }
                _ = shutdown_rx.changed() => {
                    info!("스케줄러 종료");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winrestart_core::models::machine::HostIdentity;
    use winrestart_core::ports::privilege::PrivilegeClassifier;
    use winrestart_monitor::bridge::{ConsoleSessionBridge, LocalLauncher};
    use winrestart_monitor::collector::SampleCollector;
    use winrestart_monitor::probes::NativeProbes;
    use winrestart_storage::memory::MemoryStateStore;
    use winrestart_storage::tracker::RestartStateTracker;

    const HOUR: Duration = Duration::from_secs(3_600);

    struct Unprivileged;

    impl PrivilegeClassifier for Unprivileged {
        fn has_elevated_system_privilege(&self) -> bool {
            false
        }
    }

    fn direct_sampler() -> Arc<Sampler> {
        let identity = HostIdentity {
            hostname: "test-host".to_string(),
            platform: "linux".to_string(),
            version: None,
            os: None,
        };
        let bridge = ConsoleSessionBridge::new(
            Arc::new(LocalLauncher::new()),
            std::path::PathBuf::from("unused"),
            Vec::new(),
        );
        Arc::new(Sampler::new(
            SampleCollector::new(identity, Arc::new(NativeProbes::new())),
            RestartStateTracker::new(Arc::new(MemoryStateStore::new())),
            Arc::new(Unprivileged),
            Arc::new(bridge),
        ))
    }

    #[test]
    fn delay_follows_offset_phase() {
        let schedule = TickSchedule::new(HOUR, Duration::from_secs(17 * 60));

        // 00:00 → 00:17
        assert_eq!(schedule.delay_until_next(0), Duration::from_secs(17 * 60));
        // 00:17 정각이면 한 주기 뒤
        assert_eq!(schedule.delay_until_next(17 * 60_000), HOUR);
        // 00:20 → 01:17
        assert_eq!(
            schedule.delay_until_next(20 * 60_000),
            Duration::from_secs(57 * 60)
        );
    }

    #[test]
    fn delay_is_within_period() {
        let schedule = TickSchedule::new(HOUR, Duration::from_secs(59 * 60));
        let now = 1_792_224_000_123;
        for step in 0..200 {
            let delay = schedule.delay_until_next(now + step * 37_013);
            assert!(delay > Duration::ZERO);
            assert!(delay <= HOUR);
        }
    }

    #[test]
    fn randomized_offset_is_whole_minute() {
        for _ in 0..50 {
            let offset = TickSchedule::randomized(HOUR).offset();
            assert_eq!(offset.as_secs() % 60, 0);
            assert!(offset < HOUR);
        }
    }

    #[test]
    fn zero_period_is_clamped() {
        let schedule = TickSchedule::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(schedule.delay_until_next(12_345), Duration::from_millis(1));
    }

    #[tokio::test]
    async fn ticks_are_forwarded_to_output() {
        let (tx, mut rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = Scheduler::new(
            direct_sampler(),
            TickSchedule::new(Duration::from_millis(50), Duration::ZERO),
            tx,
        );

        let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

        for _ in 0..2 {
            let record = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert!(matches!(record, Record::Sampled(_)));
        }

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn shutdown_interrupts_wait() {
        let (tx, _rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = Scheduler::new(direct_sampler(), TickSchedule::new(HOUR, Duration::ZERO), tx);

        let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
