//! # winrestart-monitor
//!
//! 머신 상태 모니터링 어댑터.
//! 전원/유휴/세션/알림 probe, 업데이트 서비스 조회, 권한 분류,
//! 콘솔 사용자 세션으로의 위임 실행 브리지를 제공한다.
//! 플랫폼별(Windows) 네이티브 API를 통해 구현하며, 그 외 플랫폼은
//! probe 값을 생략한다.

pub mod bridge;
pub mod collector;
pub mod identity;
pub mod privilege;
pub mod probes;
pub mod update_status;

#[cfg(target_os = "windows")]
pub mod windows;
