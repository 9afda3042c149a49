//! 샘플 수집기.
//!
//! probe 집합과 업데이트 서비스 조회 결과를 식별 필드가 채워진 샘플에 합친다.
//! probe 실패는 키 생략, 업데이트 서비스 실패는 `auto_update.error` 필드로 남긴다.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, warn};
use winrestart_core::error::CoreError;
use winrestart_core::models::machine::HostIdentity;
use winrestart_core::models::sample::Sample;
use winrestart_core::models::update::{UpdateStatus, RESTART_REQUIRED_KEY, UPDATE_ERROR_KEY};
use winrestart_core::ports::probe::{MachineProbes, UpdateStatusProvider};

/// 직접 경로 샘플 수집기
pub struct SampleCollector {
    identity: HostIdentity,
    probes: Arc<dyn MachineProbes>,
    update_status: Option<Arc<dyn UpdateStatusProvider>>,
}

impl SampleCollector {
    /// 새 수집기 생성 (업데이트 서비스 조회 없음)
    pub fn new(identity: HostIdentity, probes: Arc<dyn MachineProbes>) -> Self {
        Self {
            identity,
            probes,
            update_status: None,
        }
    }

    /// 업데이트 서비스 조회 어댑터 설정
    pub fn with_update_status(mut self, provider: Option<Arc<dyn UpdateStatusProvider>>) -> Self {
        self.update_status = provider;
        self
    }

    /// 현재 프로세스 컨텍스트에서 샘플 1회 수집
    pub async fn collect(&self) -> Sample {
        let mut sample = Sample::with_identity(&self.identity);
        self.apply_probes(&mut sample);

        if let Some(provider) = &self.update_status {
            apply_update_status(&mut sample, provider.query_status().await);
        }

        debug!("샘플 수집 완료: 필드 {}개", sample.len());
        sample
    }

    fn apply_probes(&self, sample: &mut Sample) {
        let probes = &self.probes;

        if let Some(uptime) = probes.uptime_ms() {
            sample.insert("uptime_ms", uptime);
        }

        if let Some(state) = probes.execution_state() {
            sample.insert("execution_state", state.bits());
            sample.insert("execution_state.display_required", state.display_required());
            sample.insert("execution_state.system_required", state.system_required());
            sample.insert("execution_state.awaymode_required", state.awaymode_required());
            sample.insert("execution_state.user_present", state.user_present());
        }

        if let Some(session_id) = probes.session_id() {
            sample.insert("session.id", session_id);
        }

        if let Some(state) = probes.notification_state() {
            sample.insert("notification_state", state.code());
            if let Some(name) = state.name() {
                sample.insert("notification_state.name", name);
            }
        }

        if let Some(idle) = probes.user_idle_ms() {
            sample.insert("user_idle_ms", idle);
        }

        if let Some(count) = probes.pending_rename_count() {
            sample.insert("pending_renames.count", count);
        }
    }
}

/// 업데이트 서비스 조회 결과를 샘플에 기록
pub fn apply_update_status(sample: &mut Sample, result: Result<UpdateStatus, CoreError>) {
    match result {
        Ok(status) => {
            let settings = &status.settings;
            sample.insert(RESTART_REQUIRED_KEY, status.restart_required);
            sample.insert("auto_update.last_check_date", format_date(status.last_check_date));
            sample.insert("auto_update.last_install_date", format_date(status.last_install_date));
            sample.insert("auto_update.enabled", status.enabled);
            sample.insert("auto_update.settings.notification_level", settings.notification_level);
            sample.insert("auto_update.settings.read_only", settings.read_only);
            sample.insert("auto_update.settings.required", settings.required);
            sample.insert(
                "auto_update.settings.scheduled_installation_day",
                settings.scheduled_installation_day,
            );
            sample.insert(
                "auto_update.settings.scheduled_installation_time",
                settings.scheduled_installation_time,
            );
            sample.insert(
                "auto_update.settings.include_recommended_updates",
                settings.include_recommended_updates,
            );
            sample.insert(
                "auto_update.settings.non_administrators_elevated",
                settings.non_administrators_elevated,
            );
            sample.insert(
                "auto_update.settings.featured_updates_enabled",
                settings.featured_updates_enabled,
            );
        }
        Err(e) => {
            warn!("업데이트 서비스 조회 실패: {e}");
            sample.insert(UPDATE_ERROR_KEY, error_text(&e));
        }
    }
}

/// 에러 메시지 + 진단 정보
fn error_text(error: &CoreError) -> String {
    match error {
        CoreError::UpdateService { message, detail } => format!("{message}\n{detail}"),
        other => format!("{other}\n{other:?}"),
    }
}

fn format_date(date: Option<DateTime<Utc>>) -> Option<String> {
    date.map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
}
