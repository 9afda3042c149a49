//! 머신 상태 probe 집합.
//!
//! `MachineProbes` 포트 구현. Windows에서는 Win32 API를 호출하고,
//! 그 외 플랫폼은 가동 시간(sysinfo)만 제공하며 나머지 키는 생략한다.

use winrestart_core::models::machine::{ExecutionState, NotificationState};
use winrestart_core::ports::probe::MachineProbes;

/// 플랫폼 네이티브 probe: `MachineProbes` 포트 구현
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeProbes;

impl NativeProbes {
    pub fn new() -> Self {
        Self
    }
}

impl MachineProbes for NativeProbes {
    fn uptime_ms(&self) -> Option<u64> {
        #[cfg(target_os = "windows")]
        {
            Some(crate::windows::uptime_ms())
        }

        #[cfg(not(target_os = "windows"))]
        {
            Some(sysinfo::System::uptime().saturating_mul(1_000))
        }
    }

    fn execution_state(&self) -> Option<ExecutionState> {
        #[cfg(target_os = "windows")]
        {
            crate::windows::execution_state()
        }

        #[cfg(not(target_os = "windows"))]
        {
            None
        }
    }

    fn session_id(&self) -> Option<u32> {
        #[cfg(target_os = "windows")]
        {
            crate::windows::session_id()
        }

        #[cfg(not(target_os = "windows"))]
        {
            None
        }
    }

    fn notification_state(&self) -> Option<NotificationState> {
        #[cfg(target_os = "windows")]
        {
            crate::windows::notification_state()
        }

        #[cfg(not(target_os = "windows"))]
        {
            None
        }
    }

    fn user_idle_ms(&self) -> Option<u32> {
        #[cfg(target_os = "windows")]
        {
            crate::windows::user_idle_ms()
        }

        #[cfg(not(target_os = "windows"))]
        {
            None
        }
    }

    fn pending_rename_count(&self) -> Option<usize> {
        #[cfg(target_os = "windows")]
        {
            crate::windows::pending_rename_count()
        }

        #[cfg(not(target_os = "windows"))]
        {
            None
        }
    }
}

/// `REG_MULTI_SZ` 버퍼의 문자열 수.
///
/// 마지막 문자열의 null과 목록 종결 null을 제거한 뒤 나눈다.
/// 중간의 빈 문자열(이름 변경 대상이 비어 있는 삭제 작업)도 한 항목으로 센다.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn count_multi_sz(data: &[u16]) -> usize {
    let mut data = data;
    for _ in 0..2 {
        if let Some((&0, rest)) = data.split_last() {
            data = rest;
        }
    }
    if data.is_empty() {
        return 0;
    }
    data.split(|&c| c == 0).count()
}
