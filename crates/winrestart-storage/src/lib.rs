//! # winrestart-storage
//!
//! 재시작 필요 상태 저장소 어댑터.
//! 업데이트 서비스가 재부팅 필요를 처음 보고한 시각을 틱 사이에 보존하고,
//! 샘플에 `auto_update.restart_required_since` 필드로 붙인다.
//!
//! ## 모듈
//! - `tracker`: 상태 전이 규칙 (저장소 무관)
//! - `registry`: HKCU 레지스트리 저장소 (Windows)
//! - `json_file`: JSON 파일 저장소 (그 외 플랫폼)
//! - `memory`: 메모리 저장소 (테스트용)

pub mod json_file;
pub mod memory;
#[cfg(target_os = "windows")]
pub mod registry;
pub mod tracker;

use std::path::Path;
use std::sync::Arc;

use winrestart_core::ports::state::RestartStateStore;

/// JSON 파일 저장소 파일 이름
pub const STATE_FILE_NAME: &str = "restart-state.json";

/// 현재 플랫폼 기본 저장소 생성
///
/// Windows는 HKCU 레지스트리, 그 외 플랫폼은 `data_dir` 아래 JSON 파일.
pub fn create_default_store(data_dir: &Path) -> Arc<dyn RestartStateStore> {
    #[cfg(target_os = "windows")]
    {
        let _ = data_dir;
        Arc::new(registry::RegistryStateStore::new())
    }

    #[cfg(not(target_os = "windows"))]
    {
        Arc::new(json_file::JsonFileStateStore::new(data_dir.join(STATE_FILE_NAME)))
    }
}
