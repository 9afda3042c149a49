//! Windows 콘솔 사용자 세션 실행기: `WTSQueryUserToken` + `CreateProcessAsUserW`.
//!
//! ## 실행 흐름
//! 1. `WTSGetActiveConsoleSessionId`로 콘솔 세션 확인
//! 2. `WTSQueryUserToken`으로 해당 세션 사용자 토큰 획득
//! 3. 임시 디렉토리 DACL에 토큰 사용자 모든 권한 추가
//!    (SYSTEM 임시 디렉토리 아래에서는 일반 사용자가 접근할 수 없다)
//! 4. 채널 파일 핸들을 상속 가능으로 표시
//! 5. `CreateProcessAsUserW` (표준 출력 = 채널 파일, 환경 블록 = 부모 환경 + TMP/TEMP)
//! 6. 프로세스 핸들로 대기/종료
//!
//! 토큰, 스레드, 프로세스 핸들은 모두 `OwnedHandle`로 감싸 drop 시 닫힌다.

use std::ffi::{c_void, OsStr, OsString};
use std::os::windows::ffi::OsStrExt;
use std::path::Path;
use std::os::windows::io::{AsRawHandle, FromRawHandle, OwnedHandle};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use windows_sys::Win32::Foundation::{
    LocalFree, SetHandleInformation, ERROR_NO_TOKEN, ERROR_SUCCESS, GENERIC_ALL, HANDLE,
    HANDLE_FLAG_INHERIT, WAIT_OBJECT_0, WAIT_TIMEOUT,
};
use windows_sys::Win32::Security::Authorization::{
    GetNamedSecurityInfoW, SetEntriesInAclW, SetNamedSecurityInfoW, EXPLICIT_ACCESS_W,
    GRANT_ACCESS, NO_MULTIPLE_TRUSTEE, SE_FILE_OBJECT, TRUSTEE_IS_SID, TRUSTEE_IS_USER, TRUSTEE_W,
};
use windows_sys::Win32::Security::{
    GetTokenInformation, TokenUser, ACL, DACL_SECURITY_INFORMATION, PSECURITY_DESCRIPTOR,
    SUB_CONTAINERS_AND_OBJECTS_INHERIT, TOKEN_USER,
};
use windows_sys::Win32::System::RemoteDesktop::{WTSGetActiveConsoleSessionId, WTSQueryUserToken};
use windows_sys::Win32::System::Threading::{
    CreateProcessAsUserW, GetExitCodeProcess, TerminateProcess, WaitForSingleObject,
    CREATE_NO_WINDOW, CREATE_UNICODE_ENVIRONMENT, PROCESS_INFORMATION, STARTF_USESTDHANDLES,
    STARTUPINFOW,
};
use winrestart_core::error::CoreError;
use winrestart_core::ports::bridge::{DelegateLauncher, DelegateProcess, DelegateRequest};

use super::merge_environment;
use crate::windows::to_wide;

/// 활성 콘솔 세션이 없을 때 `WTSGetActiveConsoleSessionId` 반환값
const NO_CONSOLE_SESSION: u32 = 0xFFFF_FFFF;

/// 대화형 데스크톱
const INTERACTIVE_DESKTOP: &str = "winsta0\\default";

/// 콘솔 사용자 토큰으로 위임 프로세스 실행
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleUserLauncher;

impl ConsoleUserLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DelegateLauncher for ConsoleUserLauncher {
    fn platform(&self) -> &str {
        "windows-console"
    }

    async fn launch(&self, request: DelegateRequest) -> Result<Box<dyn DelegateProcess>, CoreError> {
        // 전용 스레드에서 Windows API 호출
        let process = tokio::task::spawn_blocking(move || spawn_as_console_user(request))
            .await
            .map_err(|e| CoreError::Internal(format!("스레드 조인 실패: {e}")))??;

        Ok(Box::new(process))
    }
}

fn console_user_token() -> Result<OwnedHandle, CoreError> {
    let session_id = unsafe { WTSGetActiveConsoleSessionId() };
    if session_id == NO_CONSOLE_SESSION {
        return Err(CoreError::NoConsoleSession);
    }

    let mut raw_token = std::ptr::null_mut();
    if unsafe { WTSQueryUserToken(session_id, &mut raw_token) } == 0 {
        let error = std::io::Error::last_os_error();
        // 세션은 있지만 로그인한 사용자가 없음
        if error.raw_os_error() == Some(ERROR_NO_TOKEN as i32) {
            return Err(CoreError::NoConsoleSession);
        }
        return Err(CoreError::TokenUnavailable(format!(
            "세션 {session_id}: {error}"
        )));
    }

    debug!(session_id, "콘솔 사용자 토큰 획득");
    Ok(unsafe { OwnedHandle::from_raw_handle(raw_token) })
}

fn spawn_as_console_user(request: DelegateRequest) -> Result<ImpersonatedProcess, CoreError> {
    let token = console_user_token()?;
    grant_directory_access(token.as_raw_handle(), &request.scratch_dir)?;

    let stdout = request.stdout.as_raw_handle();
    if unsafe { SetHandleInformation(stdout, HANDLE_FLAG_INHERIT, HANDLE_FLAG_INHERIT) } == 0 {
        return Err(CoreError::last_os_error("SetHandleInformation"));
    }

    let mut command_line = build_command_line(request.program.as_os_str(), &request.args);
    let environment =
        environment_block(&merge_environment(std::env::vars_os(), &request.env_overrides));
    let mut desktop = to_wide(INTERACTIVE_DESKTOP);

    let mut startup: STARTUPINFOW = unsafe { std::mem::zeroed() };
    startup.cb = std::mem::size_of::<STARTUPINFOW>() as u32;
    startup.lpDesktop = desktop.as_mut_ptr();
    startup.dwFlags = STARTF_USESTDHANDLES;
    startup.hStdOutput = stdout;

    let mut info: PROCESS_INFORMATION = unsafe { std::mem::zeroed() };
    let created = unsafe {
        CreateProcessAsUserW(
            token.as_raw_handle(),
            std::ptr::null(),
            command_line.as_mut_ptr(),
            std::ptr::null(),
            std::ptr::null(),
            1,
            CREATE_UNICODE_ENVIRONMENT | CREATE_NO_WINDOW,
            environment.as_ptr().cast(),
            std::ptr::null(),
            &startup,
            &mut info,
        )
    };
    if created == 0 {
        let error = std::io::Error::last_os_error();
        return Err(CoreError::LaunchFailed(format!(
            "{}: {error}",
            request.program.display()
        )));
    }

    debug!(pid = info.dwProcessId, "콘솔 세션 위임 프로세스 시작");
    // 채널 파일 핸들(request.stdout)과 토큰은 여기서 drop
    Ok(ImpersonatedProcess {
        process: unsafe { OwnedHandle::from_raw_handle(info.hProcess) },
        _thread: unsafe { OwnedHandle::from_raw_handle(info.hThread) },
    })
}

/// 토큰 사용자 SID 조회 결과. `sid`는 `buffer` 안을 가리킨다
struct TokenUserSid {
    // TOKEN_USER 정렬을 위해 u64 버퍼
    buffer: Vec<u64>,
}

impl TokenUserSid {
    fn query(token: HANDLE) -> Result<Self, CoreError> {
        let mut needed: u32 = 0;
        unsafe { GetTokenInformation(token, TokenUser, std::ptr::null_mut(), 0, &mut needed) };
        if needed == 0 {
            return Err(CoreError::last_os_error("GetTokenInformation"));
        }

        let mut buffer = vec![0u64; (needed as usize).div_ceil(8)];
        let ok = unsafe {
            GetTokenInformation(
                token,
                TokenUser,
                buffer.as_mut_ptr().cast(),
                needed,
                &mut needed,
            )
        };
        if ok == 0 {
            return Err(CoreError::last_os_error("GetTokenInformation"));
        }
        Ok(Self { buffer })
    }

    fn sid(&self) -> *mut c_void {
        let user = self.buffer.as_ptr().cast::<TOKEN_USER>();
        unsafe { (*user).User.Sid }
    }
}

/// 디렉토리 DACL에 토큰 사용자 모든 권한(하위 상속) ACE 추가
fn grant_directory_access(token: HANDLE, dir: &Path) -> Result<(), CoreError> {
    let user = TokenUserSid::query(token)?;
    let mut path: Vec<u16> = dir.as_os_str().encode_wide().chain(std::iter::once(0)).collect();

    let mut old_dacl: *mut ACL = std::ptr::null_mut();
    let mut descriptor: PSECURITY_DESCRIPTOR = std::ptr::null_mut();
    let result = unsafe {
        GetNamedSecurityInfoW(
            path.as_ptr(),
            SE_FILE_OBJECT,
            DACL_SECURITY_INFORMATION,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            &mut old_dacl,
            std::ptr::null_mut(),
            &mut descriptor,
        )
    };
    if result != ERROR_SUCCESS {
        return Err(CoreError::Platform {
            call: "GetNamedSecurityInfoW",
            code: i64::from(result),
        });
    }

    let access = EXPLICIT_ACCESS_W {
        grfAccessPermissions: GENERIC_ALL,
        grfAccessMode: GRANT_ACCESS,
        grfInheritance: SUB_CONTAINERS_AND_OBJECTS_INHERIT,
        Trustee: TRUSTEE_W {
            pMultipleTrustee: std::ptr::null_mut(),
            MultipleTrusteeOperation: NO_MULTIPLE_TRUSTEE,
            TrusteeForm: TRUSTEE_IS_SID,
            TrusteeType: TRUSTEE_IS_USER,
            ptstrName: user.sid().cast(),
        },
    };

    let mut new_dacl: *mut ACL = std::ptr::null_mut();
    let result = unsafe { SetEntriesInAclW(1, &access, old_dacl, &mut new_dacl) };
    let result = if result == ERROR_SUCCESS {
        let applied = unsafe {
            SetNamedSecurityInfoW(
                path.as_mut_ptr(),
                SE_FILE_OBJECT,
                DACL_SECURITY_INFORMATION,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                new_dacl,
                std::ptr::null(),
            )
        };
        unsafe { LocalFree(new_dacl.cast()) };
        (applied, "SetNamedSecurityInfoW")
    } else {
        (result, "SetEntriesInAclW")
    };
    // old_dacl은 descriptor 안을 가리킨다
    unsafe { LocalFree(descriptor) };

    match result {
        (ERROR_SUCCESS, _) => {
            debug!(dir = %dir.display(), "임시 디렉토리 사용자 권한 부여");
            Ok(())
        }
        (code, call) => Err(CoreError::Platform {
            call,
            code: i64::from(code),
        }),
    }
}

/// `"program" arg1 arg2` 형식 명령줄 (null-terminated)
fn build_command_line(program: &OsStr, args: &[String]) -> Vec<u16> {
    let mut line: Vec<u16> = Vec::new();
    line.push(u16::from(b'"'));
    line.extend(program.encode_wide());
    line.push(u16::from(b'"'));
    for arg in args {
        line.push(u16::from(b' '));
        line.extend(quote_arg(arg).encode_utf16());
    }
    line.push(0);
    line
}

/// 공백이나 따옴표가 있는 인자만 따옴표로 감싼다
fn quote_arg(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains([' ', '\t', '"']) {
        return arg.to_string();
    }
    format!("\"{}\"", arg.replace('"', "\\\""))
}

/// `CREATE_UNICODE_ENVIRONMENT` 환경 블록: 키 정렬된 `KEY=VALUE\0` 목록 + 종결 `\0`
fn environment_block(vars: &[(OsString, OsString)]) -> Vec<u16> {
    let mut sorted: Vec<&(OsString, OsString)> = vars.iter().collect();
    sorted.sort_by_key(|(key, _)| key.to_string_lossy().to_uppercase());

    let mut block = Vec::new();
    for (key, value) in sorted {
        block.extend(key.encode_wide());
        block.push(u16::from(b'='));
        block.extend(value.encode_wide());
        block.push(0);
    }
    block.push(0);
    block
}

/// 콘솔 세션에서 실행 중인 위임 프로세스
struct ImpersonatedProcess {
    process: OwnedHandle,
    _thread: OwnedHandle,
}

#[async_trait]
impl DelegateProcess for ImpersonatedProcess {
    async fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<i32>, CoreError> {
        let process = self.process.try_clone()?;
        let timeout_ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX - 1);

        tokio::task::spawn_blocking(move || {
            let handle = process.as_raw_handle();
            match unsafe { WaitForSingleObject(handle, timeout_ms) } {
                WAIT_OBJECT_0 => {
                    let mut code: u32 = 0;
                    if unsafe { GetExitCodeProcess(handle, &mut code) } == 0 {
                        return Err(CoreError::last_os_error("GetExitCodeProcess"));
                    }
                    // NTSTATUS 종료 코드는 음수로 보존
                    Ok(Some(code as i32))
                }
                WAIT_TIMEOUT => Ok(None),
                _ => Err(CoreError::last_os_error("WaitForSingleObject")),
            }
        })
        .await
        .map_err(|e| CoreError::Internal(format!("스레드 조인 실패: {e}")))?
    }

    async fn terminate(&mut self) -> Result<(), CoreError> {
        if unsafe { TerminateProcess(self.process.as_raw_handle(), 1) } == 0 {
            return Err(CoreError::last_os_error("TerminateProcess"));
        }
        Ok(())
    }
}
