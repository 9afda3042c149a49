//! 권한 분류 포트.
//!
//! 구현: `winrestart-monitor::privilege` (토큰 `PrivilegeCheck`)

/// 시스템 서비스 계정 권한 보유 여부 판별
pub trait PrivilegeClassifier: Send + Sync {
    /// 현재 프로세스가 `SeTcbPrivilege`를 보유하는지.
    ///
    /// 검사 자체가 실패하면 false (일반 사용자로 간주).
    fn has_elevated_system_privilege(&self) -> bool;
}
