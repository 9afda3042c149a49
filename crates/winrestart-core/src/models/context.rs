//! 실행 컨텍스트 모델.

/// 현재 프로세스의 보안 컨텍스트 분류
///
/// 틱마다 권한 검사로 결정되며 저장하지 않는다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    /// 일반 사용자 컨텍스트: 사용자 세션 신호를 직접 읽을 수 있음
    Unprivileged,
    /// 시스템 권한이지만 비대화형 세션: 콘솔 세션으로 위임 필요
    PrivilegedNonInteractive,
}

impl ExecutionContext {
    /// 권한 검사 결과로부터 분류
    pub fn from_privilege(has_system_privilege: bool) -> Self {
        if has_system_privilege {
            Self::PrivilegedNonInteractive
        } else {
            Self::Unprivileged
        }
    }

    /// 콘솔 세션 위임이 필요한 컨텍스트인지
    pub fn needs_bridge(self) -> bool {
        matches!(self, Self::PrivilegedNonInteractive)
    }
}
