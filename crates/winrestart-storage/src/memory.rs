//! 메모리 저장소. 프로세스 종료 시 상태가 사라진다.

use parking_lot::Mutex;
use winrestart_core::error::CoreError;
use winrestart_core::ports::state::RestartStateStore;

/// 메모리 기반 `RestartStateStore` 구현
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    value: Mutex<Option<i64>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장값이 있는 상태로 생성
    pub fn with_value(epoch_secs: i64) -> Self {
        Self {
            value: Mutex::new(Some(epoch_secs)),
        }
    }

    /// 현재 저장값
    pub fn value(&self) -> Option<i64> {
        *self.value.lock()
    }
}

impl RestartStateStore for MemoryStateStore {
    fn load(&self) -> Result<Option<i64>, CoreError> {
        Ok(self.value())
    }

    fn save(&self, epoch_secs: i64) -> Result<(), CoreError> {
        *self.value.lock() = Some(epoch_secs);
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        *self.value.lock() = None;
        Ok(())
    }
}
