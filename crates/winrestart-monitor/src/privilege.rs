//! 권한 분류: `SeTcbPrivilege` 보유 여부.
//!
//! `SeTcbPrivilege`("운영 체제의 일부로 작동")는 LocalSystem 같은 서비스 계정에만
//! 부여되고 대화형 사용자에게는 부여되지 않는다. 이 권한이 있으면
//! 비대화형 서비스 세션에서 실행 중인 것으로 본다.
//!
//! 검사 실패(토큰 열기 실패, 권한 LUID 조회 실패)는 모두 false.

use winrestart_core::ports::privilege::PrivilegeClassifier;

/// 프로세스 토큰 기반 권한 분류기: `PrivilegeClassifier` 포트 구현
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenPrivilegeClassifier;

impl TokenPrivilegeClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl PrivilegeClassifier for TokenPrivilegeClassifier {
    fn has_elevated_system_privilege(&self) -> bool {
        #[cfg(target_os = "windows")]
        {
            windows::has_tcb_privilege()
        }

        #[cfg(not(target_os = "windows"))]
        {
            false
        }
    }
}

// ── Windows 구현 ──

#[cfg(target_os = "windows")]
mod windows {
    use std::os::windows::io::{AsRawHandle, FromRawHandle, OwnedHandle};

    use tracing::debug;
    use windows_sys::Win32::Foundation::LUID;
    use windows_sys::Win32::Security::{
        LookupPrivilegeValueW, PrivilegeCheck, LUID_AND_ATTRIBUTES, PRIVILEGE_SET, TOKEN_QUERY,
    };
    use windows_sys::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

    use crate::windows::to_wide;

    const SE_TCB_NAME: &str = "SeTcbPrivilege";

    pub fn has_tcb_privilege() -> bool {
        let name = to_wide(SE_TCB_NAME);
        let mut luid = LUID {
            LowPart: 0,
            HighPart: 0,
        };
        if unsafe { LookupPrivilegeValueW(std::ptr::null(), name.as_ptr(), &mut luid) } == 0 {
            debug!("LookupPrivilegeValueW 실패: {}", std::io::Error::last_os_error());
            return false;
        }

        let mut raw_token = std::ptr::null_mut();
        if unsafe { OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut raw_token) } == 0 {
            debug!("OpenProcessToken 실패: {}", std::io::Error::last_os_error());
            return false;
        }
        // 이후 모든 경로에서 drop 시 CloseHandle
        let token = unsafe { OwnedHandle::from_raw_handle(raw_token) };

        let mut privileges = PRIVILEGE_SET {
            PrivilegeCount: 1,
            Control: 0,
            Privilege: [LUID_AND_ATTRIBUTES {
                Luid: luid,
                Attributes: 0,
            }],
        };
        let mut granted = 0;
        let ok = unsafe { PrivilegeCheck(token.as_raw_handle(), &mut privileges, &mut granted) };
        if ok == 0 {
            debug!("PrivilegeCheck 실패: {}", std::io::Error::last_os_error());
            return false;
        }

        granted != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn non_windows_is_unprivileged() {
        assert!(!TokenPrivilegeClassifier::new().has_elevated_system_privilege());
    }

    #[test]
    fn check_does_not_panic() {
        // 결과는 실행 계정에 따라 다르다
        let _ = TokenPrivilegeClassifier::new().has_elevated_system_privilege();
    }
}
