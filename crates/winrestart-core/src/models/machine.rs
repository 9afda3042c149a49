//! 머신 상태 probe 모델.
//!
//! 전원 실행 상태 비트마스크, 알림(방해 금지) 상태, 호스트 식별 정보.

use serde::{Deserialize, Serialize};

/// 호스트 식별 정보: 모든 샘플에 포함
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostIdentity {
    /// 호스트 이름
    pub hostname: String,
    /// OS 계열 (`windows`, `linux`, ...)
    pub platform: String,
    /// OS 버전 문자열
    pub version: Option<String>,
    /// OS 전체 이름
    pub os: Option<String>,
}

/// 시스템 실행 상태 비트마스크 (`SystemExecutionState`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionState(pub u32);

impl ExecutionState {
    pub const SYSTEM_REQUIRED: u32 = 0x0000_0001;
    pub const DISPLAY_REQUIRED: u32 = 0x0000_0002;
    pub const USER_PRESENT: u32 = 0x0000_0004;
    pub const AWAYMODE_REQUIRED: u32 = 0x0000_0040;

    /// 원시 마스크
    pub fn bits(self) -> u32 {
        self.0
    }

    fn contains(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub fn system_required(self) -> bool {
        self.contains(Self::SYSTEM_REQUIRED)
    }

    pub fn display_required(self) -> bool {
        self.contains(Self::DISPLAY_REQUIRED)
    }

    pub fn user_present(self) -> bool {
        self.contains(Self::USER_PRESENT)
    }

    pub fn awaymode_required(self) -> bool {
        self.contains(Self::AWAYMODE_REQUIRED)
    }
}

/// 사용자 알림 상태 (`QUERY_USER_NOTIFICATION_STATE`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationState(pub i32);

impl NotificationState {
    /// Win32 심볼 이름. 알 수 없는 코드는 None
    pub fn name(self) -> Option<&'static str> {
        match self.0 {
            1 => Some("QUNS_NOT_PRESENT"),
            2 => Some("QUNS_BUSY"),
            3 => Some("QUNS_RUNNING_D3D_FULL_SCREEN"),
            4 => Some("QUNS_PRESENTATION_MODE"),
            5 => Some("QUNS_ACCEPTS_NOTIFICATIONS"),
            6 => Some("QUNS_QUIET_TIME"),
            7 => Some("QUNS_APP"),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        self.0
    }
}
