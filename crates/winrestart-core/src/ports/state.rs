//! 재시작 상태 저장소 포트.
//!
//! 구현: `winrestart-storage` (HKCU 레지스트리, JSON 파일, 메모리)

use crate::error::CoreError;

/// "재시작 필요" 최초 관측 시각을 담는 단일 영속 슬롯
///
/// 값은 UTC epoch 초. 0 이하는 미설정으로 취급한다.
pub trait RestartStateStore: Send + Sync {
    /// 저장된 시각 조회 (미설정이면 None)
    fn load(&self) -> Result<Option<i64>, CoreError>;

    /// 시각 저장
    fn save(&self, epoch_secs: i64) -> Result<(), CoreError>;

    /// 슬롯 비우기 (이미 비어 있어도 성공)
    fn clear(&self) -> Result<(), CoreError>;
}
