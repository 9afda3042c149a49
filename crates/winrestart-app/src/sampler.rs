//! 틱 단위 샘플링 오케스트레이션.
//!
//! 권한 분류 결과에 따라 직접 경로(probe → 상태 추적)와
//! 브리지 경로(콘솔 세션 위임) 중 하나를 택한다.
//! 어떤 실패도 틱 밖으로 전파하지 않는다.

use std::sync::Arc;

use tracing::{debug, info, warn};
use winrestart_core::error::CoreError;
use winrestart_core::models::context::ExecutionContext;
use winrestart_core::models::sample::Sample;
use winrestart_core::ports::bridge::SessionBridge;
use winrestart_core::ports::privilege::PrivilegeClassifier;
use winrestart_monitor::collector::SampleCollector;
use winrestart_storage::tracker::RestartStateTracker;

/// 실행 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    /// 주기 실행 (권한이 있으면 브리지)
    Scheduled,
    /// `--once`: 단발 실행, 항상 직접 경로
    Once,
    /// `--debug`: 즉시 1회, 항상 직접 경로
    Debug,
}

impl SamplingMode {
    fn may_bridge(self) -> bool {
        matches!(self, Self::Scheduled)
    }
}

/// 한 틱의 출력 레코드
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// 현재 프로세스에서 수집한 샘플
    Sampled(Sample),
    /// 위임 프로세스가 출력한 텍스트 (그대로 전달)
    Delegated(String),
}

impl Record {
    /// stdout에 쓸 텍스트 (줄바꿈 포함)
    pub fn to_line(&self) -> Result<String, CoreError> {
        match self {
            Self::Sampled(sample) => Ok(format!("{}\n", sample.to_json_line()?)),
            Self::Delegated(text) if text.ends_with('\n') => Ok(text.clone()),
            Self::Delegated(text) => Ok(format!("{text}\n")),
        }
    }
}

/// 샘플러
pub struct Sampler {
    collector: SampleCollector,
    tracker: RestartStateTracker,
    classifier: Arc<dyn PrivilegeClassifier>,
    bridge: Arc<dyn SessionBridge>,
}

impl Sampler {
    pub fn new(
        collector: SampleCollector,
        tracker: RestartStateTracker,
        classifier: Arc<dyn PrivilegeClassifier>,
        bridge: Arc<dyn SessionBridge>,
    ) -> Self {
        Self {
            collector,
            tracker,
            classifier,
            bridge,
        }
    }

    /// 틱 1회 실행. 출력할 레코드가 없으면 None
    pub async fn execute(&self, mode: SamplingMode) -> Option<Record> {
        let context = if mode.may_bridge() {
            ExecutionContext::from_privilege(self.classifier.has_elevated_system_privilege())
        } else {
            ExecutionContext::Unprivileged
        };
        debug!(?mode, ?context, "틱 시작");

        if context.needs_bridge() {
            return match self.bridge.acquire().await {
                Ok(text) => {
                    info!("콘솔 세션 샘플 수신");
                    Some(Record::Delegated(text))
                }
                Err(e) => {
                    warn!("콘솔 세션 위임 실패: 이번 틱 출력 생략: {e}");
                    None
                }
            };
        }

        let mut sample = self.collector.collect().await;
        self.tracker.apply(&mut sample);
        Some(Record::Sampled(sample))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use winrestart_core::models::machine::{ExecutionState, HostIdentity, NotificationState};
    use winrestart_core::models::update::{
        UpdateSettings, UpdateStatus, RESTART_REQUIRED_SINCE_KEY,
    };
    use winrestart_core::ports::probe::{MachineProbes, UpdateStatusProvider};
    use winrestart_storage::memory::MemoryStateStore;

    struct FixedClassifier(bool);

    impl PrivilegeClassifier for FixedClassifier {
        fn has_elevated_system_privilege(&self) -> bool {
            self.0
        }
    }

    struct StubBridge {
        result: Result<String, ()>,
        calls: AtomicUsize,
    }

    impl StubBridge {
        fn ok(text: &str) -> Self {
            Self {
                result: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                result: Err(()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SessionBridge for StubBridge {
        async fn acquire(&self) -> Result<String, CoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(|_| CoreError::NoConsoleSession)
        }
    }

    struct IdleProbes;

    impl MachineProbes for IdleProbes {
        fn uptime_ms(&self) -> Option<u64> {
            Some(1_000)
        }
        fn execution_state(&self) -> Option<ExecutionState> {
            None
        }
        fn session_id(&self) -> Option<u32> {
            Some(1)
        }
        fn notification_state(&self) -> Option<NotificationState> {
            Some(NotificationState(5))
        }
        fn user_idle_ms(&self) -> Option<u32> {
            Some(0)
        }
        fn pending_rename_count(&self) -> Option<usize> {
            None
        }
    }

    struct RebootPending;

    #[async_trait]
    impl UpdateStatusProvider for RebootPending {
        async fn query_status(&self) -> Result<UpdateStatus, CoreError> {
            Ok(UpdateStatus {
                restart_required: true,
                last_check_date: None,
                last_install_date: None,
                enabled: true,
                settings: UpdateSettings::default(),
            })
        }
    }

    fn sampler(privileged: bool, bridge: Arc<StubBridge>) -> Sampler {
        let identity = HostIdentity {
            hostname: "ws-042".to_string(),
            platform: "windows".to_string(),
            version: None,
            os: None,
        };
        let collector = SampleCollector::new(identity, Arc::new(IdleProbes))
            .with_update_status(Some(Arc::new(RebootPending)));
        let tracker = RestartStateTracker::new(Arc::new(MemoryStateStore::new()));

        Sampler::new(
            collector,
            tracker,
            Arc::new(FixedClassifier(privileged)),
            bridge,
        )
    }

    #[tokio::test]
    async fn unprivileged_takes_direct_path() {
        let bridge = Arc::new(StubBridge::ok("unused"));
        let sampler = sampler(false, bridge.clone());

        let record = sampler.execute(SamplingMode::Scheduled).await;

        let Some(Record::Sampled(sample)) = record else {
            panic!("expected direct sample");
        };
        assert!(sample.contains_key(RESTART_REQUIRED_SINCE_KEY));
        assert!(sample.contains_key("notification_state.name"));
        assert_eq!(bridge.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn privileged_scheduled_tick_forwards_delegate_text() {
        let text = "{\"service_name\":\"windows-restart\",\"session.id\":1}\n";
        let bridge = Arc::new(StubBridge::ok(text));
        let sampler = sampler(true, bridge.clone());

        let record = sampler.execute(SamplingMode::Scheduled).await;

        assert_eq!(record, Some(Record::Delegated(text.to_string())));
        assert_eq!(bridge.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn single_shot_never_bridges() {
        let bridge = Arc::new(StubBridge::ok("unused"));
        let sampler = sampler(true, bridge.clone());

        for mode in [SamplingMode::Once, SamplingMode::Debug] {
            let record = sampler.execute(mode).await;
            assert!(matches!(record, Some(Record::Sampled(_))));
        }
        assert_eq!(bridge.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bridge_failure_emits_nothing() {
        let bridge = Arc::new(StubBridge::failing());
        let sampler = sampler(true, bridge.clone());

        assert_eq!(sampler.execute(SamplingMode::Scheduled).await, None);
        assert_eq!(bridge.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delegated_text_is_forwarded_verbatim() {
        let text = "{\"a\":1}\n";
        assert_eq!(Record::Delegated(text.to_string()).to_line().unwrap(), text);
        assert_eq!(
            Record::Delegated("{\"a\":1}".to_string()).to_line().unwrap(),
            text
        );
    }

    #[test]
    fn sampled_record_is_one_line() {
        let mut sample = Sample::new();
        sample.insert("session.id", 1u32);
        let line = Record::Sampled(sample).to_line().unwrap();
        assert_eq!(line, "{\"session.id\":1}\n");
    }
}
