//! 샘플링 통합 테스트.
//!
//! 수집기 → 재시작 상태 추적 → 직렬화, 파일 저장소 재시작 시나리오,
//! 로컬 실행기 기반 브리지 왕복, 설정 파일 로드.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tempfile::TempDir;
use winrestart_core::config_manager::ConfigManager;
use winrestart_core::error::CoreError;
use winrestart_core::models::machine::{ExecutionState, HostIdentity, NotificationState};
use winrestart_core::models::sample::{Sample, SampleValue};
use winrestart_core::models::update::{
    UpdateSettings, UpdateStatus, RESTART_REQUIRED_KEY, RESTART_REQUIRED_SINCE_KEY,
    UPDATE_ERROR_KEY,
};
use winrestart_core::ports::probe::{MachineProbes, UpdateStatusProvider};
use winrestart_monitor::collector::SampleCollector;
use winrestart_storage::json_file::JsonFileStateStore;
use winrestart_storage::tracker::RestartStateTracker;

struct SilentProbes;

impl MachineProbes for SilentProbes {
    fn uptime_ms(&self) -> Option<u64> {
        None
    }
    fn execution_state(&self) -> Option<ExecutionState> {
        None
    }
    fn session_id(&self) -> Option<u32> {
        None
    }
    fn notification_state(&self) -> Option<NotificationState> {
        None
    }
    fn user_idle_ms(&self) -> Option<u32> {
        None
    }
    fn pending_rename_count(&self) -> Option<usize> {
        None
    }
}

/// 호출마다 미리 정한 재부팅 필요 값을 차례로 보고
struct ScriptedUpdates {
    script: Mutex<Vec<Option<bool>>>,
}

impl ScriptedUpdates {
    fn new(mut script: Vec<Option<bool>>) -> Self {
        script.reverse();
        Self {
            script: Mutex::new(script),
        }
    }
}

#[async_trait]
impl UpdateStatusProvider for ScriptedUpdates {
    async fn query_status(&self) -> Result<UpdateStatus, CoreError> {
        match self.script.lock().pop().flatten() {
            Some(restart_required) => Ok(UpdateStatus {
                restart_required,
                last_check_date: None,
                last_install_date: None,
                enabled: true,
                settings: UpdateSettings::default(),
            }),
            None => Err(CoreError::UpdateService {
                message: "0x8024001E".to_string(),
                detail: "service shutting down".to_string(),
            }),
        }
    }
}

fn identity() -> HostIdentity {
    HostIdentity {
        hostname: "ws-042".to_string(),
        platform: "windows".to_string(),
        version: Some("10.0.22631".to_string()),
        os: Some("Windows 11 Pro".to_string()),
    }
}

#[tokio::test]
async fn direct_path_serializes_tracked_sample() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStateStore::new(temp.path().join("restart-state.json")));
    let tracker = RestartStateTracker::new(store.clone());
    let collector = SampleCollector::new(identity(), Arc::new(SilentProbes)).with_update_status(
        Some(Arc::new(ScriptedUpdates::new(vec![Some(true), None, Some(false)]))),
    );

    // 1틱: 재부팅 필요 → 시작 시각 기록
    let mut first = collector.collect().await;
    tracker.apply(&mut first);
    let first_since = first.get(RESTART_REQUIRED_SINCE_KEY).cloned();
    assert!(matches!(first_since, Some(SampleValue::Text(_))));

    let line = first.to_json_line().unwrap();
    let parsed: Sample = serde_json::from_str(&line).unwrap();
    assert_eq!(parsed, first);
    assert_eq!(
        parsed.get("meta.local_os"),
        Some(&SampleValue::Text("Windows 11 Pro".to_string()))
    );

    // 2틱: 업데이트 서비스 실패 → 에러 필드, 저장값 유지
    let mut second = collector.collect().await;
    tracker.apply(&mut second);
    assert!(second.contains_key(UPDATE_ERROR_KEY));
    assert!(!second.contains_key(RESTART_REQUIRED_KEY));
    assert!(!second.contains_key(RESTART_REQUIRED_SINCE_KEY));
    assert!(store.path().exists());

    // 3틱: 재부팅 완료 → null, 저장값 삭제
    let mut third = collector.collect().await;
    tracker.apply(&mut third);
    assert_eq!(third.get(RESTART_REQUIRED_SINCE_KEY), Some(&SampleValue::Null));
    assert!(!store.path().exists());
}

#[test]
fn restart_state_survives_process_restarts() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("restart-state.json");
    let t = |hour| Utc.with_ymd_and_hms(2026, 10, 17, hour, 0, 0).unwrap();

    // 틱마다 새 저장소 인스턴스 (프로세스 재시작과 동일)
    let tick = |required: bool, hour: u32| {
        RestartStateTracker::new(Arc::new(JsonFileStateStore::new(path.clone())))
            .update_at(required, t(hour))
            .unwrap()
    };

    assert_eq!(tick(true, 1), Some(t(1)));
    assert_eq!(tick(true, 2), Some(t(1)));
    assert_eq!(tick(false, 3), None);
    assert_eq!(tick(true, 4), Some(t(4)));
}

#[test]
fn config_file_overrides_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"schedule":{"period_secs":600},"bridge":{"timeout_ms":2500}}"#,
    )
    .unwrap();

    let config = ConfigManager::with_path(path).unwrap().get();

    assert_eq!(config.period(), Duration::from_secs(600));
    assert!(config.schedule.randomize_offset);
    assert_eq!(config.bridge_timeout(), Duration::from_millis(2_500));
    assert_eq!(config.update_query_timeout(), Duration::from_secs(60));
}

#[cfg(unix)]
mod bridge_roundtrip {
    use super::*;
    use std::path::PathBuf;
    use winrestart_core::ports::bridge::SessionBridge;
    use winrestart_monitor::bridge::{ConsoleSessionBridge, LocalLauncher};

    #[tokio::test]
    async fn delegate_sample_round_trips_through_channel_file() {
        let temp = TempDir::new().unwrap();

        // 위임 프로세스가 출력할 샘플
        let mut expected = Sample::with_identity(&identity());
        expected.insert("notification_state", 5);
        expected.insert("notification_state.name", "QUNS_ACCEPTS_NOTIFICATIONS");
        expected.insert(RESTART_REQUIRED_KEY, false);
        expected.insert(RESTART_REQUIRED_SINCE_KEY, None::<String>);
        let line = expected.to_json_line().unwrap();

        let script = temp.path().join("delegate.json");
        std::fs::write(&script, format!("{line}\n")).unwrap();

        let work = temp.path().join("work");
        std::fs::create_dir(&work).unwrap();
        let bridge = ConsoleSessionBridge::new(
            Arc::new(LocalLauncher::new()),
            PathBuf::from("/bin/cat"),
            vec![script.display().to_string()],
        )
        .with_timeout(Duration::from_secs(5))
        .with_temp_dir(Some(work.clone()));

        let output = bridge.acquire().await.unwrap();

        assert_eq!(output, format!("{line}\n"));
        let parsed: Sample = serde_json::from_str(output.trim_end()).unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(std::fs::read_dir(&work).unwrap().count(), 0);
    }
}
