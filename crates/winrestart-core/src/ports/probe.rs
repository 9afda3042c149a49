//! 머신 상태 probe 포트.
//!
//! 구현: `winrestart-monitor::probes` (Win32 FFI), `winrestart-monitor::update_status`

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::machine::{ExecutionState, NotificationState};
use crate::models::update::UpdateStatus;

/// 고정된 머신 상태 probe 집합
///
/// 각 probe는 값을 얻지 못하면 None을 반환한다 (API 실패, 미지원).
/// 에러를 던지지 않으며 샘플은 해당 키만 생략한다.
pub trait MachineProbes: Send + Sync {
    /// 부팅 후 경과 시간 (밀리초)
    fn uptime_ms(&self) -> Option<u64>;

    /// 전원 실행 상태 비트마스크
    fn execution_state(&self) -> Option<ExecutionState>;

    /// 현재 프로세스가 속한 세션 ID
    fn session_id(&self) -> Option<u32>;

    /// 알림(방해 금지) 상태
    fn notification_state(&self) -> Option<NotificationState>;

    /// 마지막 사용자 입력 이후 경과 시간 (밀리초).
    ///
    /// 입력 기록이 없거나(마지막 입력 틱 0) 호출 실패 시 None.
    fn user_idle_ms(&self) -> Option<u32>;

    /// 보류 중인 파일 이름 변경 작업 수 (`PendingFileRenameOperations`)
    fn pending_rename_count(&self) -> Option<usize>;
}

/// Windows Update 서비스 조회 포트
///
/// 조회 전체가 실패할 수 있으며, 호출자는 실패를 샘플의 에러 필드로 기록한다.
#[async_trait]
pub trait UpdateStatusProvider: Send + Sync {
    /// 재부팅 필요 여부, 마지막 검색/설치 시각, 정책 설정 스냅샷 조회
    async fn query_status(&self) -> Result<UpdateStatus, CoreError>;
}
