//! Windows Update 상태 모델.
//!
//! `Microsoft.Update.SystemInfo` / `Microsoft.Update.AutoUpdate` 조회 결과.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 업데이트 서비스가 보고한 재부팅 필요 여부 샘플 키
pub const RESTART_REQUIRED_KEY: &str = "auto_update.restart_required";

/// 재부팅 필요 상태가 처음 관측된 시각 샘플 키
pub const RESTART_REQUIRED_SINCE_KEY: &str = "auto_update.restart_required_since";

/// 업데이트 서비스 조회 실패 샘플 키
pub const UPDATE_ERROR_KEY: &str = "auto_update.error";

/// 업데이트 서비스 상태 스냅샷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatus {
    /// 업데이트 완료를 위해 재부팅 필요
    pub restart_required: bool,
    /// 마지막 검색 성공 시각 (UTC)
    pub last_check_date: Option<DateTime<Utc>>,
    /// 마지막 설치 성공 시각 (UTC)
    pub last_install_date: Option<DateTime<Utc>>,
    /// 자동 업데이트 서비스 활성화 여부
    pub enabled: bool,
    /// 자동 업데이트 정책
    pub settings: UpdateSettings,
}

/// 자동 업데이트 정책 설정
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSettings {
    /// 알림 수준 (`AutomaticUpdatesNotificationLevel`)
    pub notification_level: i64,
    /// 정책으로 잠겨 변경 불가
    pub read_only: bool,
    /// 그룹 정책으로 강제됨
    pub required: bool,
    /// 예약 설치 요일 (0 = 매일)
    pub scheduled_installation_day: i64,
    /// 예약 설치 시각 (0-23)
    pub scheduled_installation_time: i64,
    pub include_recommended_updates: bool,
    /// 관리자가 아닌 사용자의 승인 허용
    pub non_administrators_elevated: bool,
    pub featured_updates_enabled: bool,
}
