//! 호스트 식별 정보 수집.
//!
//! sysinfo 기반 호스트 이름과 OS 버전. 프로세스 시작 시 한 번 수집한다.

use sysinfo::System;
use tracing::debug;
use winrestart_core::models::machine::HostIdentity;

/// 현재 호스트의 식별 정보
pub fn host_identity() -> HostIdentity {
    let identity = HostIdentity {
        hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
        platform: std::env::consts::OS.to_string(),
        version: System::os_version(),
        os: System::long_os_version(),
    };
    debug!(
        "호스트: {} ({}, {:?})",
        identity.hostname, identity.platform, identity.version
    );
    identity
}
