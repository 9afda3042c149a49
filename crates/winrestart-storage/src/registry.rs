//! HKCU 레지스트리 저장소 (Windows).
//!
//! `HKEY_CURRENT_USER\Software\Windows Restart` 키의
//! `Restart Required Since` 값(REG_QWORD, epoch 초)에 보존한다.
//! QWORD가 아닌 값은 저장값 없음으로 보고, 다음 쓰기가 덮어쓴다.

use std::ffi::{c_void, OsStr};
use std::os::windows::ffi::OsStrExt;

use tracing::{debug, warn};
use windows_sys::Win32::Foundation::{
    ERROR_FILE_NOT_FOUND, ERROR_MORE_DATA, ERROR_SUCCESS, ERROR_UNSUPPORTED_TYPE,
};
use windows_sys::Win32::System::Registry::{
    RegCloseKey, RegCreateKeyExW, RegDeleteKeyValueW, RegGetValueW, RegSetValueExW, HKEY,
    HKEY_CURRENT_USER, KEY_SET_VALUE, REG_OPTION_NON_VOLATILE, REG_QWORD, RRF_RT_REG_QWORD,
};
use winrestart_core::error::CoreError;
use winrestart_core::ports::state::RestartStateStore;

const STATE_KEY: &str = r"Software\Windows Restart";
const RESTART_REQUIRED_SINCE_VALUE: &str = "Restart Required Since";

fn to_wide(s: &str) -> Vec<u16> {
    OsStr::new(s)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

/// 레지스트리 기반 `RestartStateStore` 구현
#[derive(Debug, Clone)]
pub struct RegistryStateStore {
    subkey: Vec<u16>,
    value: Vec<u16>,
}

impl Default for RegistryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryStateStore {
    pub fn new() -> Self {
        Self::with_key(STATE_KEY)
    }

    /// HKCU 아래 지정한 하위 키 사용
    pub fn with_key(subkey: &str) -> Self {
        Self {
            subkey: to_wide(subkey),
            value: to_wide(RESTART_REQUIRED_SINCE_VALUE),
        }
    }
}

fn registry_error(call: &'static str, code: u32) -> CoreError {
    CoreError::StateStorage(format!("{call} 실패: 코드 {code}"))
}

impl RestartStateStore for RegistryStateStore {
    fn load(&self) -> Result<Option<i64>, CoreError> {
        let mut data: i64 = 0;
        let mut size = std::mem::size_of::<i64>() as u32;
        let result = unsafe {
            RegGetValueW(
                HKEY_CURRENT_USER,
                self.subkey.as_ptr(),
                self.value.as_ptr(),
                RRF_RT_REG_QWORD,
                std::ptr::null_mut(),
                &mut data as *mut i64 as *mut c_void,
                &mut size,
            )
        };

        match result {
            ERROR_SUCCESS => Ok(Some(data)),
            ERROR_FILE_NOT_FOUND => Ok(None),
            ERROR_UNSUPPORTED_TYPE | ERROR_MORE_DATA => {
                warn!("재시작 상태 레지스트리 값 형식 불일치 (코드 {result}), 저장값 없음으로 처리");
                Ok(None)
            }
            code => Err(registry_error("RegGetValueW", code)),
        }
    }

    fn save(&self, epoch_secs: i64) -> Result<(), CoreError> {
        let mut key: HKEY = unsafe { std::mem::zeroed() };
        let result = unsafe {
            RegCreateKeyExW(
                HKEY_CURRENT_USER,
                self.subkey.as_ptr(),
                0,
                std::ptr::null(),
                REG_OPTION_NON_VOLATILE,
                KEY_SET_VALUE,
                std::ptr::null(),
                &mut key,
                std::ptr::null_mut(),
            )
        };
        if result != ERROR_SUCCESS {
            return Err(registry_error("RegCreateKeyExW", result));
        }

        let bytes = epoch_secs.to_le_bytes();
        let result = unsafe {
            RegSetValueExW(
                key,
                self.value.as_ptr(),
                0,
                REG_QWORD,
                bytes.as_ptr(),
                bytes.len() as u32,
            )
        };
        unsafe { RegCloseKey(key) };

        if result != ERROR_SUCCESS {
            return Err(registry_error("RegSetValueExW", result));
        }
        debug!("재시작 상태 레지스트리 저장: {epoch_secs}");
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        let result = unsafe {
            RegDeleteKeyValueW(HKEY_CURRENT_USER, self.subkey.as_ptr(), self.value.as_ptr())
        };
        match result {
            ERROR_SUCCESS | ERROR_FILE_NOT_FOUND => Ok(()),
            code => Err(registry_error("RegDeleteKeyValueW", code)),
        }
    }
}
