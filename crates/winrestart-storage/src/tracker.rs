//! 재시작 필요 상태 추적기.
//!
//! 저장된 시각(T)과 이번 관측값의 조합으로 다음 상태를 정한다.
//!
//! | 저장값 | 관측   | 동작            | 보고   |
//! |--------|--------|-----------------|--------|
//! | 없음   | true   | 현재 시각 저장  | 현재   |
//! | 없음   | false  | -               | null   |
//! | T      | true   | -               | T      |
//! | T      | false  | 저장값 삭제     | null   |
//!
//! 0 이하이거나 시각으로 해석할 수 없는 저장값은 없는 것으로 본다.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info, warn};
use winrestart_core::error::CoreError;
use winrestart_core::models::sample::{Sample, SampleValue};
use winrestart_core::models::update::{RESTART_REQUIRED_KEY, RESTART_REQUIRED_SINCE_KEY};
use winrestart_core::ports::state::RestartStateStore;

/// 재시작 필요 상태 추적기
pub struct RestartStateTracker {
    store: Arc<dyn RestartStateStore>,
}

impl RestartStateTracker {
    pub fn new(store: Arc<dyn RestartStateStore>) -> Self {
        Self { store }
    }

    /// 현재 시각 기준 상태 갱신
    pub fn update(&self, restart_required: bool) -> Result<Option<DateTime<Utc>>, CoreError> {
        self.update_at(restart_required, Utc::now())
    }

    /// 주어진 시각 기준 상태 갱신. 재부팅 필요 상태가 시작된 시각 반환
    pub fn update_at(
        &self,
        restart_required: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, CoreError> {
        let stored = self.store.load()?.and_then(valid_timestamp);

        match (stored, restart_required) {
            (None, true) => {
                let secs = now.timestamp();
                self.store.save(secs)?;
                info!("재부팅 필요 상태 시작: {secs}");
                Ok(DateTime::from_timestamp(secs, 0))
            }
            (None, false) => Ok(None),
            (Some(since), true) => Ok(Some(since)),
            (Some(since), false) => {
                self.store.clear()?;
                info!("재부팅 필요 상태 해소 (시작 {since})");
                Ok(None)
            }
        }
    }

    /// 샘플의 `auto_update.restart_required` 값을 읽어 시작 시각 필드를 붙인다
    ///
    /// 재부팅 필요 필드가 없으면(업데이트 서비스 실패 등) 샘플을 건드리지 않는다.
    /// 저장소 실패 시 경고만 남기고 시작 시각 필드를 생략한다.
    pub fn apply(&self, sample: &mut Sample) {
        let Some(required) = sample.get(RESTART_REQUIRED_KEY).and_then(SampleValue::as_bool)
        else {
            debug!("재부팅 필요 필드 없음: 상태 추적 생략");
            return;
        };

        match self.update(required) {
            Ok(since) => sample.insert(
                RESTART_REQUIRED_SINCE_KEY,
                since.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ),
            Err(e) => warn!("재시작 상태 저장소 실패: {e}"),
        }
    }
}

fn valid_timestamp(secs: i64) -> Option<DateTime<Utc>> {
    if secs <= 0 {
        return None;
    }
    DateTime::from_timestamp(secs, 0)
}
