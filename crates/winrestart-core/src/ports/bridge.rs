//! 세션 간 실행 브리지 포트.
//!
//! 시스템 권한 프로세스가 콘솔 사용자 세션에서만 보이는 신호를 얻기 위해
//! 같은 프로그램을 사용자 토큰으로 한 번 실행하고 출력을 회수한다.
//!
//! 구현: `winrestart-monitor::bridge`

use std::ffi::OsString;
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CoreError;

/// 콘솔 세션에서 얻은 샘플 텍스트를 돌려주는 브리지
#[async_trait]
pub trait SessionBridge: Send + Sync {
    /// 위임 실행 1회. 성공 시 위임 프로세스가 출력한 텍스트 그대로 반환.
    ///
    /// 내부 재시도 없음. 임시 파일/토큰은 성공·실패와 무관하게 정리된다.
    async fn acquire(&self) -> Result<String, CoreError>;
}

/// 위임 프로세스 실행 요청
#[derive(Debug)]
pub struct DelegateRequest {
    /// 실행 파일 경로
    pub program: PathBuf,
    /// 인자
    pub args: Vec<String>,
    /// 표준 출력으로 연결할 채널 파일
    pub stdout: File,
    /// 위임 프로세스 전용 임시 디렉토리 (실행 사용자에게 쓰기 권한 필요)
    pub scratch_dir: PathBuf,
    /// 부모 환경 위에 덮어쓸 환경 변수 (TMP/TEMP 등)
    pub env_overrides: Vec<(OsString, OsString)>,
}

/// 위임 프로세스를 띄우는 플랫폼 어댑터
#[async_trait]
pub trait DelegateLauncher: Send + Sync {
    /// 플랫폼 이름 (windows-console, local)
    fn platform(&self) -> &str;

    /// 프로세스 실행
    async fn launch(&self, request: DelegateRequest) -> Result<Box<dyn DelegateProcess>, CoreError>;
}

/// 실행 중인 위임 프로세스
#[async_trait]
pub trait DelegateProcess: Send {
    /// 제한 시간 동안 종료 대기. 종료 시 종료 코드, 시간 초과 시 None
    async fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<i32>, CoreError>;

    /// 강제 종료
    async fn terminate(&mut self) -> Result<(), CoreError>;
}
