//! 세션 간 실행 브리지.
//!
//! 시스템 권한 서비스 세션에서는 콘솔 사용자의 알림 상태나 입력 유휴 시간이 보이지 않는다.
//! 같은 프로그램을 콘솔 사용자 토큰으로 `--once` 실행하고, 상속 가능한 임시 파일을
//! 표준 출력으로 연결해 결과를 회수한다.
//!
//! - Windows: `WTSQueryUserToken` + `CreateProcessAsUserW` ([`ConsoleUserLauncher`])
//! - 그 외: 현재 사용자로 자식 프로세스 실행 ([`LocalLauncher`])
//!
//! ## 실행 흐름
//! 1. 출력 채널 파일 + 위임 프로세스용 임시 디렉터리 생성
//! 2. TMP/TEMP를 임시 디렉터리로 지정해 위임 프로세스 실행
//! 3. 제한 시간 대기 (초과 시 강제 종료)
//! 4. 채널 파일 내용을 그대로 반환 (비어 있으면 실패)
//!
//! 채널 파일과 임시 디렉터리는 `tempfile` drop 시 모든 경로에서 삭제된다.

mod local;

#[cfg(target_os = "windows")]
mod windows;

pub use local::LocalLauncher;

#[cfg(target_os = "windows")]
pub use windows::ConsoleUserLauncher;

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use winrestart_core::error::CoreError;
use winrestart_core::ports::bridge::{DelegateLauncher, DelegateRequest, SessionBridge};

/// 위임 프로세스 기본 제한 시간
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const TEMP_PREFIX: &str = "windows-restart-";

/// 콘솔 세션 위임 브리지: `SessionBridge` 포트 구현
pub struct ConsoleSessionBridge {
    launcher: Arc<dyn DelegateLauncher>,
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    temp_dir: Option<PathBuf>,
}

impl ConsoleSessionBridge {
    /// 새 브리지 생성
    ///
    /// `program`과 `args`는 위임 실행할 명령 (보통 현재 실행 파일 + `--once`).
    pub fn new(launcher: Arc<dyn DelegateLauncher>, program: PathBuf, args: Vec<String>) -> Self {
        Self {
            launcher,
            program,
            args,
            timeout: DEFAULT_TIMEOUT,
            temp_dir: None,
        }
    }

    /// 제한 시간 설정
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 채널 파일/임시 디렉터리 위치 설정 (None이면 시스템 임시 디렉터리)
    pub fn with_temp_dir(mut self, temp_dir: Option<PathBuf>) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    fn temp_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[async_trait]
impl SessionBridge for ConsoleSessionBridge {
    async fn acquire(&self) -> Result<String, CoreError> {
        let root = self.temp_root();

        let channel = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".out")
            .tempfile_in(&root)?;
        let scratch = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir_in(&root)?;

        let scratch_path = scratch.path().as_os_str().to_os_string();
        let request = DelegateRequest {
            program: self.program.clone(),
            args: self.args.clone(),
            stdout: channel.reopen()?,
            scratch_dir: scratch.path().to_path_buf(),
            env_overrides: vec![
                (OsString::from("TMP"), scratch_path.clone()),
                (OsString::from("TEMP"), scratch_path),
            ],
        };

        debug!(
            platform = self.launcher.platform(),
            program = %self.program.display(),
            channel = %channel.path().display(),
            "위임 프로세스 실행"
        );

        let mut process = self.launcher.launch(request).await?;

        let exit_code = match process.wait_timeout(self.timeout).await? {
            Some(code) => code,
            None => {
                warn!("위임 프로세스 제한 시간 초과 ({:?}): 강제 종료", self.timeout);
                if let Err(e) = process.terminate().await {
                    warn!("위임 프로세스 종료 실패: {e}");
                }
                return Err(CoreError::ExecutionTimeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
        };

        if exit_code != 0 {
            return Err(CoreError::DelegateExit { code: exit_code });
        }

        let bytes = tokio::fs::read(channel.path()).await?;
        let output = String::from_utf8(bytes)
            .map_err(|e| CoreError::Internal(format!("위임 출력 UTF-8 아님: {e}")))?;
        if output.trim().is_empty() {
            return Err(CoreError::EmptyDelegateOutput);
        }

        info!("위임 샘플 회수 완료: {} 바이트", output.len());
        Ok(output)
    }
}

/// 부모 환경 위에 덮어쓰기 변수를 적용한 전체 환경 목록
///
/// 키 비교는 Windows 규칙대로 대소문자를 구분하지 않는다.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn merge_environment<I>(
    base: I,
    overrides: &[(OsString, OsString)],
) -> Vec<(OsString, OsString)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut merged: Vec<(OsString, OsString)> = base
        .into_iter()
        .filter(|(key, _)| !overrides.iter().any(|(k, _)| same_key(k, key)))
        .collect();
    merged.extend(overrides.iter().cloned());
    merged
}

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn same_key(a: &OsStr, b: &OsStr) -> bool {
    a.to_string_lossy()
        .eq_ignore_ascii_case(&b.to_string_lossy())
}

/// 현재 플랫폼의 위임 프로세스 실행기 생성
pub fn create_platform_launcher() -> Arc<dyn DelegateLauncher> {
    #[cfg(target_os = "windows")]
    {
        Arc::new(ConsoleUserLauncher::new())
    }

    #[cfg(not(target_os = "windows"))]
    {
        debug!("콘솔 세션 개념 없음: 로컬 실행기 사용");
        Arc::new(LocalLauncher::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winrestart_core::ports::bridge::DelegateProcess;

    fn os(s: &str) -> OsString {
        OsString::from(s)
    }

    #[test]
    fn merge_overrides_case_insensitively() {
        let base = vec![
            (os("Path"), os(r"C:\Windows")),
            (os("Tmp"), os(r"C:\Windows\Temp")),
            (os("TEMP"), os(r"C:\Windows\Temp")),
        ];
        let overrides = vec![(os("TMP"), os(r"C:\scratch")), (os("TEMP"), os(r"C:\scratch"))];

        let merged = merge_environment(base, &overrides);

        assert_eq!(merged.len(), 3);
        assert!(merged.contains(&(os("Path"), os(r"C:\Windows"))));
        assert!(merged.contains(&(os("TMP"), os(r"C:\scratch"))));
        assert!(merged.contains(&(os("TEMP"), os(r"C:\scratch"))));
        assert!(!merged.iter().any(|(k, _)| k == "Tmp"));
    }

    #[test]
    fn factory_returns_send_sync() {
        let launcher = create_platform_launcher();
        fn assert_send_sync<T: Send + Sync>(_: &T) {}
        assert_send_sync(&launcher);
        assert!(!launcher.platform().is_empty());
    }

    /// 요청을 기록하고 지정한 텍스트를 채널 파일에 바로 쓰는 실행기
    struct RecordingLauncher {
        output: &'static str,
        seen: std::sync::Mutex<Option<(PathBuf, Vec<(OsString, OsString)>, bool)>>,
    }

    struct Exited;

    #[async_trait]
    impl DelegateProcess for Exited {
        async fn wait_timeout(&mut self, _timeout: Duration) -> Result<Option<i32>, CoreError> {
            Ok(Some(0))
        }

        async fn terminate(&mut self) -> Result<(), CoreError> {
            Ok(())
        }
    }

    #[async_trait]
    impl DelegateLauncher for RecordingLauncher {
        fn platform(&self) -> &str {
            "recording"
        }

        async fn launch(
            &self,
            mut request: DelegateRequest,
        ) -> Result<Box<dyn DelegateProcess>, CoreError> {
            use std::io::Write;
            request.stdout.write_all(self.output.as_bytes())?;
            let exists = request.scratch_dir.is_dir();
            *self.seen.lock().unwrap() =
                Some((request.scratch_dir, request.env_overrides, exists));
            Ok(Box::new(Exited))
        }
    }

    fn recording(output: &'static str) -> Arc<RecordingLauncher> {
        Arc::new(RecordingLauncher {
            output,
            seen: std::sync::Mutex::new(None),
        })
    }

    #[tokio::test]
    async fn launcher_receives_scratch_dir_matching_temp_overrides() {
        let temp = tempfile::TempDir::new().unwrap();
        let launcher = recording("{\"session.id\":1}\n");
        let bridge = ConsoleSessionBridge::new(launcher.clone(), PathBuf::from("delegate"), Vec::new())
            .with_temp_dir(Some(temp.path().to_path_buf()));

        assert_eq!(bridge.acquire().await.unwrap(), "{\"session.id\":1}\n");

        let (scratch, overrides, existed) = launcher.seen.lock().unwrap().take().unwrap();
        assert!(existed);
        assert!(scratch.starts_with(temp.path()));
        for name in ["TMP", "TEMP"] {
            assert!(overrides.contains(&(os(name), scratch.clone().into_os_string())));
        }
        // 임시 디렉토리는 회수 후 삭제
        assert!(!scratch.exists());
    }

    #[tokio::test]
    async fn whitespace_only_output_is_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let bridge = ConsoleSessionBridge::new(recording("\r\n"), PathBuf::from("delegate"), Vec::new())
            .with_temp_dir(Some(temp.path().to_path_buf()));

        let err = bridge.acquire().await.unwrap_err();

        assert!(matches!(err, CoreError::EmptyDelegateOutput));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    mod unix {
        use super::super::*;
        use tempfile::TempDir;

        fn shell_bridge(script: &str, temp: &TempDir) -> ConsoleSessionBridge {
            ConsoleSessionBridge::new(
                Arc::new(LocalLauncher::new()),
                PathBuf::from("/bin/sh"),
                vec!["-c".to_string(), script.to_string()],
            )
            .with_temp_dir(Some(temp.path().to_path_buf()))
        }

        fn leftovers(temp: &TempDir) -> usize {
            std::fs::read_dir(temp.path()).unwrap().count()
        }

        #[tokio::test]
        async fn returns_delegate_output_verbatim() {
            let temp = TempDir::new().unwrap();
            let bridge = shell_bridge(r#"printf '{"session.id":1}\n'"#, &temp);

            let output = bridge.acquire().await.unwrap();

            assert_eq!(output, "{\"session.id\":1}\n");
            assert_eq!(leftovers(&temp), 0);
        }

        #[tokio::test]
        async fn timeout_kills_delegate_and_cleans_up() {
            let temp = TempDir::new().unwrap();
            let bridge = shell_bridge("exec sleep 5", &temp).with_timeout(Duration::from_millis(200));

            let started = std::time::Instant::now();
            let err = bridge.acquire().await.unwrap_err();

            assert!(matches!(err, CoreError::ExecutionTimeout { timeout_ms: 200 }));
            assert!(started.elapsed() < Duration::from_secs(4));
            assert_eq!(leftovers(&temp), 0);
        }

        #[tokio::test]
        async fn delegate_sees_scratch_temp_dir() {
            let temp = TempDir::new().unwrap();
            let bridge = shell_bridge(r#"test -d "$TMP" && printf '%s' "$TEMP""#, &temp);

            let output = bridge.acquire().await.unwrap();

            assert!(output.starts_with(temp.path().to_str().unwrap()));
            assert!(output.contains(TEMP_PREFIX));
            assert_eq!(leftovers(&temp), 0);
        }

        #[tokio::test]
        async fn empty_output_is_error() {
            let temp = TempDir::new().unwrap();
            let bridge = shell_bridge("exit 0", &temp);

            let err = bridge.acquire().await.unwrap_err();

            assert!(matches!(err, CoreError::EmptyDelegateOutput));
            assert_eq!(leftovers(&temp), 0);
        }

        #[tokio::test]
        async fn nonzero_exit_is_error() {
            let temp = TempDir::new().unwrap();
            let bridge = shell_bridge("printf partial; exit 3", &temp);

            let err = bridge.acquire().await.unwrap_err();

            assert!(matches!(err, CoreError::DelegateExit { code: 3 }));
            assert_eq!(leftovers(&temp), 0);
        }

        #[tokio::test]
        async fn missing_program_is_launch_error() {
            let temp = TempDir::new().unwrap();
            let bridge = ConsoleSessionBridge::new(
                Arc::new(LocalLauncher::new()),
                temp.path().join("does-not-exist"),
                Vec::new(),
            )
            .with_temp_dir(Some(temp.path().to_path_buf()));

            let err = bridge.acquire().await.unwrap_err();

            assert!(matches!(err, CoreError::LaunchFailed(_)));
            assert_eq!(leftovers(&temp), 0);
        }
    }
}
