//! windows-restart 핵심 에러 타입.
//!
//! 어댑터 crate(monitor, storage)와 바이너리는 모두 `CoreError`를 반환한다.
//! 틱 단위 복구 정책은 호출자(샘플러)가 결정한다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// OS API 호출 실패
    #[error("{call} 실패: 코드 {code}")]
    Platform {
        /// 실패한 API 이름
        call: &'static str,
        /// Win32 에러 코드 또는 반환값
        code: i64,
    },

    /// 활성 콘솔 세션 없음 (로그인한 사용자 없음)
    #[error("활성 콘솔 세션 없음")]
    NoConsoleSession,

    /// 콘솔 사용자 토큰 획득 실패
    #[error("사용자 토큰 획득 실패: {0}")]
    TokenUnavailable(String),

    /// 위임 프로세스 실행 실패
    #[error("위임 프로세스 실행 실패: {0}")]
    LaunchFailed(String),

    /// 실행 타임아웃
    #[error("실행 타임아웃: {timeout_ms}ms 초과")]
    ExecutionTimeout {
        /// 초과된 타임아웃 시간 (밀리초)
        timeout_ms: u64,
    },

    /// 위임 프로세스 비정상 종료
    #[error("위임 프로세스 종료 코드 {code}")]
    DelegateExit {
        /// 프로세스 종료 코드
        code: i32,
    },

    /// 위임 프로세스가 정상 종료했지만 출력이 비어 있음
    #[error("위임 프로세스 출력 없음")]
    EmptyDelegateOutput,

    /// 업데이트 서비스 조회 실패
    #[error("업데이트 서비스 조회 실패: {message}")]
    UpdateService {
        /// 요약 메시지
        message: String,
        /// 진단 정보 (stderr, 원본 출력 등)
        detail: String,
    },

    /// 재시작 상태 저장소 에러
    #[error("상태 저장소 에러: {0}")]
    StateStorage(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl CoreError {
    /// 직전 OS 에러 코드로 `Platform` 에러 생성
    pub fn last_os_error(call: &'static str) -> Self {
        let code = std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or_default();
        Self::Platform {
            call,
            code: i64::from(code),
        }
    }
}
