//! Windows 플랫폼: 머신 상태 probe.
//!
//! `CallNtPowerInformation`, `GetLastInputInfo`, `ProcessIdToSessionId`,
//! `SHQueryUserNotificationState`, 레지스트리 `RegGetValueW` 기반.

#![cfg(target_os = "windows")]

use std::ffi::{c_void, OsStr};
use std::os::windows::ffi::OsStrExt;

use tracing::debug;
use windows_sys::Win32::Foundation::{ERROR_FILE_NOT_FOUND, ERROR_SUCCESS};
use windows_sys::Win32::System::Power::{CallNtPowerInformation, POWER_INFORMATION_LEVEL};
use windows_sys::Win32::System::Registry::{RegGetValueW, HKEY_LOCAL_MACHINE, RRF_RT_REG_MULTI_SZ};
use windows_sys::Win32::System::RemoteDesktop::ProcessIdToSessionId;
use windows_sys::Win32::System::SystemInformation::{GetTickCount, GetTickCount64};
use windows_sys::Win32::System::Threading::GetCurrentProcessId;
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{GetLastInputInfo, LASTINPUTINFO};
use windows_sys::Win32::UI::Shell::SHQueryUserNotificationState;
use winrestart_core::models::machine::{ExecutionState, NotificationState};

use crate::probes::count_multi_sz;

/// `POWER_INFORMATION_LEVEL::SystemExecutionState`
const SYSTEM_EXECUTION_STATE: POWER_INFORMATION_LEVEL = 16;

const SESSION_MANAGER_KEY: &str = r"SYSTEM\CurrentControlSet\Control\Session Manager";
const PENDING_RENAMES_VALUE: &str = "PendingFileRenameOperations";

/// UTF-16 문자열로 변환 (null-terminated)
pub(crate) fn to_wide(s: &str) -> Vec<u16> {
    OsStr::new(s)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

/// 부팅 후 경과 시간 (밀리초)
pub fn uptime_ms() -> u64 {
    unsafe { GetTickCount64() }
}

/// 시스템 실행 상태 비트마스크
pub fn execution_state() -> Option<ExecutionState> {
    let mut state: u32 = 0;
    let status = unsafe {
        CallNtPowerInformation(
            SYSTEM_EXECUTION_STATE,
            std::ptr::null(),
            0,
            &mut state as *mut u32 as *mut c_void,
            std::mem::size_of::<u32>() as u32,
        )
    };
    if status == 0 {
        Some(ExecutionState(state))
    } else {
        debug!("CallNtPowerInformation 실패: NTSTATUS {status:#x}");
        None
    }
}

/// 현재 프로세스의 세션 ID
pub fn session_id() -> Option<u32> {
    let mut session_id: u32 = 0;
    let ok = unsafe { ProcessIdToSessionId(GetCurrentProcessId(), &mut session_id) };
    if ok != 0 {
        Some(session_id)
    } else {
        debug!("ProcessIdToSessionId 실패");
        None
    }
}

/// 사용자 알림 상태
pub fn notification_state() -> Option<NotificationState> {
    let mut state = 0;
    let hr = unsafe { SHQueryUserNotificationState(&mut state) };
    if hr == 0 {
        Some(NotificationState(state))
    } else {
        debug!("SHQueryUserNotificationState 실패: HRESULT {hr:#x}");
        None
    }
}

/// 마지막 입력 이후 경과 시간 (밀리초)
///
/// `LASTINPUTINFO`는 32비트 `dwTime`이므로 `GetTickCount`와 wrapping 차이로 계산.
pub fn user_idle_ms() -> Option<u32> {
    unsafe {
        let mut last_input: LASTINPUTINFO = std::mem::zeroed();
        last_input.cbSize = std::mem::size_of::<LASTINPUTINFO>() as u32;

        if GetLastInputInfo(&mut last_input) == 0 || last_input.dwTime == 0 {
            return None;
        }

        Some(GetTickCount().wrapping_sub(last_input.dwTime))
    }
}

/// `PendingFileRenameOperations` 항목 수. 값이 없으면 None
pub fn pending_rename_count() -> Option<usize> {
    let subkey = to_wide(SESSION_MANAGER_KEY);
    let value = to_wide(PENDING_RENAMES_VALUE);

    unsafe {
        // 1차 호출: 필요한 버퍼 크기 (바이트)
        let mut size: u32 = 0;
        let result = RegGetValueW(
            HKEY_LOCAL_MACHINE,
            subkey.as_ptr(),
            value.as_ptr(),
            RRF_RT_REG_MULTI_SZ,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            &mut size,
        );
        if result == ERROR_FILE_NOT_FOUND {
            return None;
        }
        if result != ERROR_SUCCESS {
            debug!("PendingFileRenameOperations 크기 조회 실패: 코드 {result}");
            return None;
        }

        let mut buffer = vec![0u16; (size as usize).div_ceil(2)];
        let result = RegGetValueW(
            HKEY_LOCAL_MACHINE,
            subkey.as_ptr(),
            value.as_ptr(),
            RRF_RT_REG_MULTI_SZ,
            std::ptr::null_mut(),
            buffer.as_mut_ptr() as *mut c_void,
            &mut size,
        );
        if result != ERROR_SUCCESS {
            debug!("PendingFileRenameOperations 읽기 실패: 코드 {result}");
            return None;
        }

        buffer.truncate((size as usize) / 2);
        Some(count_multi_sz(&buffer))
    }
}
